use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use records::{read_cell_sequences, write_cell_sequences, CellID};

use super::{Label, TrajectoryDataset};
use crate::collate::Sequence;
use crate::features::taxi_symbols;
use crate::grid::Grid;
use crate::outliers::{OutlierKind, OutlierParams, Synthesized, Synthesizer};
use crate::vocab::Vocabulary;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxiConfig {
    pub data_dir: PathBuf,
    /// The trajectories are read from `{file_name}.csv`
    pub file_name: String,
    pub grid: Grid,
    pub outliers: OutlierParams,
    pub outlier_kinds: Vec<OutlierKind>,
    pub include_outliers: bool,
}

impl Default for TaxiConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/porto"),
            file_name: "porto_processed".to_string(),
            grid: Grid::default(),
            outliers: OutlierParams::default(),
            outlier_kinds: vec![OutlierKind::RouteSwitch],
            include_outliers: true,
        }
    }
}

impl TaxiConfig {
    pub fn source_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.csv", self.file_name))
    }

    pub fn vocab_path(&self) -> PathBuf {
        self.data_dir.join("vocab.json")
    }

    pub fn outlier_dir(&self) -> PathBuf {
        self.data_dir.join("outliers")
    }

    pub fn outlier_path(&self, kind: OutlierKind) -> PathBuf {
        self.outlier_dir().join(kind.file_name(&self.outliers))
    }

    pub fn varied_outlier_path(&self, kind: OutlierKind) -> PathBuf {
        self.outlier_dir().join(kind.varied_file_name(&self.outliers))
    }
}

/// Counters from assembling a taxi dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub real: usize,
    pub outliers_added: usize,
    /// Outliers longer than any real trajectory, which wouldn't fit the context
    pub skipped_long: usize,
}

/// Room for the longest trajectory plus SOT and EOT.
pub fn taxi_block_size(trajectories: &[Vec<CellID>]) -> usize {
    trajectories.iter().map(|t| t.len()).max().unwrap_or(0) + 2
}

/// Grid-cell taxi trajectories. Real ones come first, then any configured outliers.
pub struct TaxiDataset {
    config: TaxiConfig,
    block_size: usize,
    report: LoadReport,
    vocab: Vocabulary,
    trajectories: Vec<(Label, Vec<CellID>)>,
}

impl TaxiDataset {
    pub fn load(config: TaxiConfig) -> Result<Self> {
        let path = config.source_path();
        info!("Loading taxi trajectories from {}", path.display());
        let real = read_trajectories(&path)?;

        let vocab = Vocabulary::load(config.vocab_path())?;
        vocab
            .sot_id()
            .with_context(|| format!("checking {}", config.vocab_path().display()))?;

        let mut outliers = Vec::new();
        if config.include_outliers {
            for kind in &config.outlier_kinds {
                let path = config.outlier_path(*kind);
                if !path.exists() {
                    bail!(
                        "{} doesn't exist. Run generate-outliers with the same parameters first.",
                        path.display()
                    );
                }
                outliers.push((kind.label(), read_trajectories(&path)?));
            }
        }
        Ok(Self::from_parts(config, real, outliers, vocab))
    }

    /// Assembles a dataset from trajectories already in memory. Outliers that don't fit the
    /// context derived from `real` are skipped.
    pub fn from_parts(
        config: TaxiConfig,
        real: Vec<Vec<CellID>>,
        outliers: Vec<(Label, Vec<Vec<CellID>>)>,
        vocab: Vocabulary,
    ) -> Self {
        let block_size = taxi_block_size(&real);
        let mut report = LoadReport {
            real: real.len(),
            ..Default::default()
        };
        let mut trajectories: Vec<(Label, Vec<CellID>)> = real
            .into_iter()
            .map(|traj| (Label::NonOutlier, traj))
            .collect();

        for (label, batch) in outliers {
            let mut added = 0;
            for traj in batch {
                if traj.len() + 2 <= block_size {
                    trajectories.push((label, traj));
                    added += 1;
                } else {
                    report.skipped_long += 1;
                }
            }
            info!("Added {} {} trajectories", added, label);
            report.outliers_added += added;
        }
        if report.skipped_long > 0 {
            warn!(
                "Skipped {} outliers longer than the context size {}",
                report.skipped_long, block_size
            );
        }
        info!("Context size: {}", block_size);

        Self {
            config,
            block_size,
            report,
            vocab,
            trajectories,
        }
    }

    pub fn config(&self) -> &TaxiConfig {
        &self.config
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn real_trajectories(&self) -> impl Iterator<Item = &Vec<CellID>> {
        self.trajectories[..self.report.real]
            .iter()
            .map(|(_, traj)| traj)
    }

    /// Synthesizes each kind from the real trajectories, with that kind's fixed seed.
    pub fn generate_outliers(&self, kinds: &[OutlierKind], vary: bool) -> Vec<Synthesized> {
        let sources: Vec<Vec<CellID>> = self.real_trajectories().cloned().collect();
        let synthesizer = Synthesizer::new(self.config.grid);
        kinds
            .iter()
            .map(|kind| {
                synthesizer.generate(
                    &sources,
                    *kind,
                    &self.config.outliers,
                    kind.default_seed(),
                    vary,
                )
            })
            .collect()
    }

    /// Writes each batch where `load` will look for it, overwriting anything already there.
    /// Batches with varied parameters go to a separate `_vary` file, so they never replace an
    /// evaluation set.
    pub fn write_outliers(&self, batches: &[Synthesized]) -> Result<Vec<PathBuf>> {
        fs_err::create_dir_all(self.config.outlier_dir())?;
        let mut paths = Vec::new();
        for batch in batches {
            let path = if batch.varied {
                warn!(
                    "{} outliers were generated with varied parameters; they won't be loaded",
                    batch.kind
                );
                self.config.varied_outlier_path(batch.kind)
            } else {
                self.config.outlier_path(batch.kind)
            };
            let file = fs_err::File::create(&path)?;
            write_cell_sequences(std::io::BufWriter::new(file), &batch.trajectories)?;
            info!(
                "Wrote {} {} outliers to {}",
                batch.trajectories.len(),
                batch.kind,
                path.display()
            );
            paths.push(path);
        }
        Ok(paths)
    }
}

impl TrajectoryDataset for TaxiDataset {
    type Metadata = Label;

    fn len(&self) -> usize {
        self.trajectories.len()
    }

    fn get(&self, index: usize) -> Result<(Label, Sequence)> {
        match self.trajectories.get(index) {
            Some((label, traj)) => Ok((*label, Sequence::Symbols(taxi_symbols(traj)))),
            None => bail!(
                "Index {} out of range for {} taxi trajectories",
                index,
                self.trajectories.len()
            ),
        }
    }

    fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    fn block_size(&self) -> usize {
        self.block_size
    }
}

fn read_trajectories(path: &Path) -> Result<Vec<Vec<CellID>>> {
    let file = fs_err::File::open(path)?;
    read_cell_sequences(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
}
