use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use records::literal::format_strs;
use records::{CheckinRecord, UserID};

use super::{Label, TrajectoryDataset};
use crate::collate::Sequence;
use crate::features::FeatureSet;
use crate::vocab::Vocabulary;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinConfig {
    pub data_dir: PathBuf,
    /// The table read is `{file_name}_grouped.tsv`
    pub file_name: String,
    pub features: FeatureSet,
    /// If false, outlier-labelled days are dropped before indexing
    pub include_outliers: bool,
    /// The outlier window is this many days back from the last observed date
    pub outlier_days: i64,
    /// Numeric ids of the users whose days inside the window are anomalous
    pub outlier_users: Vec<u64>,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/work-outliers/checkin-atl"),
            file_name: "data".to_string(),
            features: FeatureSet::all(),
            include_outliers: false,
            outlier_days: 14,
            outlier_users: Vec::new(),
        }
    }
}

impl CheckinConfig {
    pub fn source_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}_grouped.tsv", self.file_name))
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.data_dir.join(self.features.vocab_file_name())
    }

    pub fn features_path(&self) -> PathBuf {
        self.data_dir.join(self.features.features_file_name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckinSample {
    pub record: CheckinRecord,
    pub label: Label,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckinMeta {
    pub user_id: UserID,
    pub date: String,
    pub label: Label,
}

/// What loading learns about the table, before any configuration is derived from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckinStats {
    pub rows: usize,
    pub outliers: usize,
    /// Outlier rows removed because the config excludes them
    pub dropped: usize,
    /// The most visits in any remaining day
    pub max_visits: usize,
}

impl CheckinStats {
    /// Every visit contributes one symbol per feature, plus the user, the day of week and EOT.
    pub fn block_size(&self, features: &FeatureSet) -> usize {
        self.max_visits * features.len() + 3
    }
}

// Wider than the whole range chrono can represent, and small enough for a Duration
const MAX_OUTLIER_DAYS: i64 = 200_000_000;

/// Labels a day as an outlier when its user is in `outlier_users` and its date falls within the
/// last `outlier_days` days of the observed range.
pub fn label_outliers(
    records: Vec<CheckinRecord>,
    outlier_users: &BTreeSet<u64>,
    outlier_days: i64,
) -> Result<Vec<CheckinSample>> {
    if !(0..=MAX_OUTLIER_DAYS).contains(&outlier_days) {
        bail!(
            "outlier_days {} must be between 0 and {}",
            outlier_days,
            MAX_OUTLIER_DAYS
        );
    }
    let cutoff = match records.iter().map(|r| r.date).max() {
        Some(last) => match last.checked_sub_signed(Duration::days(outlier_days)) {
            Some(cutoff) => Some(cutoff),
            None => bail!(
                "An outlier window of {} days before {} is out of range",
                outlier_days,
                last
            ),
        },
        None => None,
    };
    Ok(records
        .into_iter()
        .map(|record| {
            let in_window = cutoff.map(|c| record.date > c).unwrap_or(false);
            let label = if in_window && outlier_users.contains(&record.user_number) {
                Label::Outlier
            } else {
                Label::NonOutlier
            };
            CheckinSample { record, label }
        })
        .collect())
}

/// Semantic check-in trajectories, one per user-day.
pub struct CheckinDataset {
    config: CheckinConfig,
    block_size: usize,
    stats: CheckinStats,
    vocab: Vocabulary,
    samples: Vec<CheckinSample>,
}

impl CheckinDataset {
    pub fn load(config: CheckinConfig) -> Result<Self> {
        let (samples, stats) = Self::load_records(&config)?;
        let vocab = Vocabulary::load(config.vocab_path())?;
        Ok(Self::finalize(config, samples, stats, vocab))
    }

    /// The first phase of loading: read, label and filter the table. Doesn't need a vocabulary.
    pub fn load_records(config: &CheckinConfig) -> Result<(Vec<CheckinSample>, CheckinStats)> {
        let path = config.source_path();
        info!("Loading check-ins from {}", path.display());
        let file = fs_err::File::open(&path)?;
        let records = records::checkin::load(std::io::BufReader::new(file))
            .with_context(|| format!("reading {}", path.display()))?;
        Self::prepare(config, records)
    }

    /// Labels and filters records already in memory.
    pub fn prepare(
        config: &CheckinConfig,
        records: Vec<CheckinRecord>,
    ) -> Result<(Vec<CheckinSample>, CheckinStats)> {
        let outlier_users: BTreeSet<u64> = config.outlier_users.iter().cloned().collect();
        if outlier_users.is_empty() {
            warn!("No outlier users are configured, so no day will be labelled an outlier");
        } else {
            info!("Outlier users: {:?}", outlier_users);
        }

        let mut stats = CheckinStats {
            rows: records.len(),
            ..Default::default()
        };
        let mut samples = label_outliers(records, &outlier_users, config.outlier_days)?;
        stats.outliers = samples.iter().filter(|s| s.label.is_outlier()).count();
        if !config.include_outliers {
            samples.retain(|s| !s.label.is_outlier());
            stats.dropped = stats.outliers;
        }
        stats.max_visits = samples
            .iter()
            .map(|s| s.record.visits.len())
            .max()
            .unwrap_or(0);
        info!(
            "Include outliers: {} ({} labelled, {} dropped)",
            config.include_outliers, stats.outliers, stats.dropped
        );
        Ok((samples, stats))
    }

    /// The second phase: fix the derived block size and take ownership of everything.
    pub fn finalize(
        config: CheckinConfig,
        samples: Vec<CheckinSample>,
        stats: CheckinStats,
        vocab: Vocabulary,
    ) -> Self {
        let block_size = stats.block_size(&config.features);
        info!("Context size: {}", block_size);
        Self {
            config,
            block_size,
            stats,
            vocab,
            samples,
        }
    }

    pub fn config(&self) -> &CheckinConfig {
        &self.config
    }

    pub fn stats(&self) -> &CheckinStats {
        &self.stats
    }

    pub fn samples(&self) -> &[CheckinSample] {
        &self.samples
    }

    pub fn symbols(&self, index: usize) -> Result<Vec<String>> {
        match self.samples.get(index) {
            Some(sample) => Ok(self.config.features.checkin_symbols(&sample.record)),
            None => bail!(
                "Index {} out of range for {} check-in days",
                index,
                self.samples.len()
            ),
        }
    }

    pub fn samples_for_user(&self, user_id: &UserID) -> Result<Vec<(CheckinMeta, Sequence)>> {
        let mut result = Vec::new();
        for (idx, sample) in self.samples.iter().enumerate() {
            if &sample.record.user_id == user_id {
                result.push(self.get(idx)?);
            }
        }
        Ok(result)
    }

    /// Writes every day's symbol sequence as a tab-separated table of `user_id_int`, `date`, and
    /// `feature`.
    pub fn export_features<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        for sample in &self.samples {
            let symbols = self.config.features.checkin_symbols(&sample.record);
            writer.serialize(ExportFeatureRow {
                user_id_int: sample.record.user_number,
                date: &sample.record.raw_date,
                feature: format_strs(&symbols),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_features(&self) -> Result<PathBuf> {
        let path = self.config.features_path();
        let file = fs_err::File::create(&path)?;
        self.export_features(std::io::BufWriter::new(file))?;
        info!("Wrote {} feature rows to {}", self.samples.len(), path.display());
        Ok(path)
    }
}

impl TrajectoryDataset for CheckinDataset {
    type Metadata = CheckinMeta;

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Result<(CheckinMeta, Sequence)> {
        let symbols = self.symbols(index)?;
        let sample = &self.samples[index];
        let tokens = self.vocab.encode(&symbols).with_context(|| {
            format!(
                "encoding {} on {}",
                sample.record.user_id, sample.record.raw_date
            )
        })?;
        let meta = CheckinMeta {
            user_id: sample.record.user_id.clone(),
            date: sample.record.raw_date.clone(),
            label: sample.label,
        };
        Ok((meta, Sequence::Tokens(tokens)))
    }

    fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    fn block_size(&self) -> usize {
        self.block_size
    }
}

#[derive(Serialize)]
struct ExportFeatureRow<'a> {
    user_id_int: u64,
    date: &'a str,
    feature: String,
}
