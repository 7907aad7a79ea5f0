use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use records::{CellID, CheckinRecord};

use crate::vocab::{EOT, SOT};

/// One per-visit attribute of a check-in trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Place,
    /// The visit's grid-cell token
    Gps,
    Duration,
    Distance,
}

impl Feature {
    pub fn name(self) -> &'static str {
        match self {
            Feature::Place => "place",
            Feature::Gps => "gps",
            Feature::Duration => "duration",
            Feature::Distance => "distance",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Feature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "place" => Ok(Feature::Place),
            "gps" => Ok(Feature::Gps),
            "duration" => Ok(Feature::Duration),
            "distance" => Ok(Feature::Distance),
            x => bail!("Unknown feature {:?}", x),
        }
    }
}

// Order of symbols inside each per-visit block
const VISIT_ORDER: [Feature; 4] = [
    Feature::Place,
    Feature::Gps,
    Feature::Duration,
    Feature::Distance,
];

// Order of suffixes in vocabulary and export file names
const NAME_ORDER: [Feature; 4] = [
    Feature::Gps,
    Feature::Distance,
    Feature::Duration,
    Feature::Place,
];

/// Which per-visit features a check-in dataset emits. Fixed for the lifetime of a dataset, and
/// each combination has its own vocabulary table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Feature>", into = "Vec<Feature>")]
pub struct FeatureSet {
    enabled: Vec<Feature>,
}

impl FeatureSet {
    pub fn new(features: Vec<Feature>) -> Result<Self> {
        if features.is_empty() {
            bail!("At least one feature has to be enabled");
        }
        let mut enabled = Vec::new();
        for f in features {
            if enabled.contains(&f) {
                bail!("Feature {} listed twice", f);
            }
            enabled.push(f);
        }
        Ok(Self { enabled })
    }

    pub fn all() -> Self {
        Self {
            enabled: VISIT_ORDER.to_vec(),
        }
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    /// Like `_gps_duration_place`. Other tools writing vocabulary tables rely on this order.
    pub fn suffix(&self) -> String {
        let mut suffix = String::new();
        for f in NAME_ORDER {
            if self.contains(f) {
                suffix.push('_');
                suffix.push_str(f.name());
            }
        }
        suffix
    }

    pub fn vocab_file_name(&self) -> String {
        format!("vocab{}.json", self.suffix())
    }

    pub fn features_file_name(&self) -> String {
        format!("data_with_features{}.tsv", self.suffix())
    }

    /// Vectorizes one user-day as `[user_id, day_of_week, <per-visit block>*, EOT]`.
    pub fn checkin_symbols(&self, record: &CheckinRecord) -> Vec<String> {
        let mut symbols = Vec::with_capacity(record.visits.len() * self.len() + 3);
        symbols.push(record.user_id.0.clone());
        symbols.push(record.day_of_week.clone());
        for visit in &record.visits {
            for f in VISIT_ORDER {
                if !self.contains(f) {
                    continue;
                }
                symbols.push(match f {
                    Feature::Place => visit.place.clone(),
                    Feature::Gps => visit.cell.clone(),
                    Feature::Duration => visit.duration.clone(),
                    Feature::Distance => visit.distance.clone(),
                });
            }
        }
        symbols.push(EOT.to_string());
        symbols
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}

impl TryFrom<Vec<Feature>> for FeatureSet {
    type Error = anyhow::Error;

    fn try_from(features: Vec<Feature>) -> Result<Self> {
        Self::new(features)
    }
}

impl From<FeatureSet> for Vec<Feature> {
    fn from(set: FeatureSet) -> Self {
        set.enabled
    }
}

impl FromStr for FeatureSet {
    type Err = anyhow::Error;

    /// Parses a comma-separated list like "place,gps".
    fn from_str(s: &str) -> Result<Self> {
        let features = s
            .split(',')
            .map(|x| x.parse())
            .collect::<Result<Vec<Feature>>>()?;
        Self::new(features)
    }
}

/// Vectorizes a taxi trajectory as `[SOT, <cell id>*, EOT]`.
pub fn taxi_symbols(cells: &[CellID]) -> Vec<String> {
    let mut symbols = Vec::with_capacity(cells.len() + 2);
    symbols.push(SOT.to_string());
    symbols.extend(cells.iter().map(|c| c.to_string()));
    symbols.push(EOT.to_string());
    symbols
}
