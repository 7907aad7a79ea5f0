//! Turns raw trajectories into token sequences for an anomaly-detection model: vocabulary
//! encoding, feature vectorization, synthetic outliers, the two dataset variants, batching, and
//! train/validation partitioning.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod collate;
pub mod dataset;
mod features;
mod grid;
pub mod outliers;
mod split;
mod vocab;

pub use collate::{collate, Batch, Sequence};
pub use dataset::{
    CheckinConfig, CheckinDataset, CheckinMeta, Label, LoadReport, TaxiConfig, TaxiDataset,
    TrajectoryDataset,
};
pub use features::{taxi_symbols, Feature, FeatureSet};
pub use grid::Grid;
pub use outliers::{OutlierKind, OutlierParams, Synthesized, Synthesizer};
pub use split::partition;
pub use vocab::{TokenID, VocabError, Vocabulary, EOT, PAD, SOT};
