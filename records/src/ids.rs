use std::fmt;

use serde::{Deserialize, Serialize};

/// A discretized position on a rectangular grid, encoded as `row * width + col`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellID(pub usize);

impl fmt::Display for CellID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The day-level owner of a check-in trajectory, like "user_35"
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserID(pub String);

impl UserID {
    /// The numeric suffix after the last underscore; "user_35" is 35.
    pub fn number(&self) -> anyhow::Result<u64> {
        let suffix = self.0.rsplit('_').next().unwrap_or(&self.0);
        match suffix.parse::<u64>() {
            Ok(x) => Ok(x),
            Err(_) => bail!("{:?} doesn't end in a numeric suffix", self.0),
        }
    }
}

impl fmt::Display for UserID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
