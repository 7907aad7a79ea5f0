mod checkin;
mod taxi;

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::collate::{self, Batch, Sequence};
use crate::split;
use crate::vocab::Vocabulary;

pub use checkin::{label_outliers, CheckinConfig, CheckinDataset, CheckinMeta, CheckinSample, CheckinStats};
pub use taxi::{taxi_block_size, LoadReport, TaxiConfig, TaxiDataset};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "non outlier")]
    NonOutlier,
    /// A check-in day from an anomalous user inside the outlier window
    #[serde(rename = "outlier")]
    Outlier,
    #[serde(rename = "route switch outlier")]
    RouteSwitch,
    #[serde(rename = "detour outlier")]
    Detour,
}

impl Label {
    pub fn is_outlier(self) -> bool {
        self != Label::NonOutlier
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Label::NonOutlier => "non outlier",
            Label::Outlier => "outlier",
            Label::RouteSwitch => "route switch outlier",
            Label::Detour => "detour outlier",
        };
        write!(f, "{label}")
    }
}

/// The contract both dataset variants share. Datasets are read-only once loaded, so `get` and
/// `collate` can be called from many readers at once.
pub trait TrajectoryDataset {
    type Metadata: Clone;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<(Self::Metadata, Sequence)>;

    fn vocab(&self) -> &Vocabulary;

    /// The longest token sequence this dataset can produce, derived at load time.
    fn block_size(&self) -> usize;

    fn partition(&self, train_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
        split::partition(self.len(), train_fraction, seed)
    }

    fn collate(&self, items: &[(Self::Metadata, Sequence)]) -> Result<Batch<Self::Metadata>> {
        collate::collate(items, self.vocab())
    }

    /// Fetches and collates the given indices, in order.
    fn batch(&self, indices: &[usize]) -> Result<Batch<Self::Metadata>> {
        let items = indices
            .iter()
            .map(|idx| self.get(*idx))
            .collect::<Result<Vec<_>>>()?;
        self.collate(&items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names() {
        assert_eq!(Label::NonOutlier.to_string(), "non outlier");
        assert_eq!(Label::RouteSwitch.to_string(), "route switch outlier");
        assert_eq!(
            serde_json::to_string(&Label::Detour).unwrap(),
            "\"detour outlier\""
        );
        assert!(!Label::NonOutlier.is_outlier());
        assert!(Label::Outlier.is_outlier());
    }
}
