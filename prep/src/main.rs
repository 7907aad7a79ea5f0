#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use structopt::StructOpt;

use trajectories::{
    CheckinConfig, CheckinDataset, TaxiConfig, TaxiDataset, TrajectoryDataset, Vocabulary,
};

#[derive(StructOpt)]
#[structopt(about = "Prepares trajectory datasets for outlier detection")]
enum Command {
    /// Load a check-in dataset and summarize it
    Checkin {
        /// A JSON file with the dataset config. Missing fields use defaults.
        #[structopt(long)]
        config: PathBuf,
        #[structopt(long, default_value = "0.9")]
        train_fraction: f64,
        #[structopt(long, default_value = "123")]
        seed: u64,
        /// Also write the vectorized days as a TSV table next to the source
        #[structopt(long)]
        export_features: bool,
    },
    /// Load a taxi dataset, including any configured outlier files, and summarize it
    Taxi {
        #[structopt(long)]
        config: PathBuf,
        #[structopt(long, default_value = "0.9")]
        train_fraction: f64,
        #[structopt(long, default_value = "123")]
        seed: u64,
    },
    /// Synthesize the configured outlier kinds from a taxi dataset and write them out
    GenerateOutliers {
        #[structopt(long)]
        config: PathBuf,
        /// Randomly nudge detour parameters. The results go to separate `_vary` files that
        /// datasets never load.
        #[structopt(long)]
        vary: bool,
    },
    /// Build and save the vocabulary table a dataset expects
    BuildVocab {
        /// The path to a check-in dataset config
        #[structopt(long)]
        checkin: Option<PathBuf>,
        /// The path to a taxi dataset config
        #[structopt(long)]
        taxi: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Command::from_args() {
        Command::Checkin {
            config,
            train_fraction,
            seed,
            export_features,
        } => {
            let ds = CheckinDataset::load(read_config(&config)?)?;
            let stats = ds.stats();
            info!(
                "{} check-in rows, {} labelled outliers, {} dropped",
                stats.rows, stats.outliers, stats.dropped
            );
            summarize(&ds, train_fraction, seed)?;
            if export_features {
                ds.write_features()?;
            }
        }
        Command::Taxi {
            config,
            train_fraction,
            seed,
        } => {
            let ds = TaxiDataset::load(read_config(&config)?)?;
            let report = ds.report();
            info!(
                "{} real trajectories, {} outliers added, {} too long",
                report.real, report.outliers_added, report.skipped_long
            );
            summarize(&ds, train_fraction, seed)?;
        }
        Command::GenerateOutliers { config, vary } => {
            let mut config: TaxiConfig = read_config(&config)?;
            // The files being generated may not exist yet
            config.include_outliers = false;
            let kinds = config.outlier_kinds.clone();
            let ds = TaxiDataset::load(config)?;
            let batches = ds.generate_outliers(&kinds, vary);
            ds.write_outliers(&batches)?;
        }
        Command::BuildVocab { checkin, taxi } => match (checkin, taxi) {
            (Some(path), None) => build_checkin_vocab(read_config(&path)?)?,
            (None, Some(path)) => build_taxi_vocab(read_config(&path)?)?,
            (Some(_), Some(_)) => bail!("You can't specify both --checkin and --taxi"),
            (None, None) => bail!("Specify either --checkin or --taxi"),
        },
    }
    Ok(())
}

fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs_err::read_to_string(path)?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn summarize<D: TrajectoryDataset>(ds: &D, train_fraction: f64, seed: u64) -> Result<()> {
    info!(
        "{} trajectories, block size {}, vocabulary of {} symbols",
        ds.len(),
        ds.block_size(),
        ds.vocab().size()
    );
    let (train, val) = ds.partition(train_fraction, seed)?;
    info!("{} for training, {} for validation", train.len(), val.len());

    // Encoding every trajectory once catches vocabulary mismatches before training does
    let mut longest = 0;
    for chunk in train.chunks(256).chain(val.chunks(256)) {
        let batch = ds.batch(chunk)?;
        longest = longest.max(batch.width());
    }
    if longest > ds.block_size() {
        bail!(
            "A trajectory of {} tokens doesn't fit the block size {}",
            longest,
            ds.block_size()
        );
    }
    Ok(())
}

fn build_checkin_vocab(mut config: CheckinConfig) -> Result<()> {
    // Every day gets a symbol, even ones the dataset will exclude
    config.include_outliers = true;
    let (samples, _) = CheckinDataset::load_records(&config)?;
    let symbols = samples
        .iter()
        .flat_map(|s| config.features.checkin_symbols(&s.record));
    let vocab = Vocabulary::build(symbols)?;
    vocab.save(config.vocab_path())
}

fn build_taxi_vocab(config: TaxiConfig) -> Result<()> {
    // Outliers can land on any cell, not just the ones real trajectories visit
    let cells = (0..config.grid.num_cells()).map(|c| c.to_string());
    let vocab = Vocabulary::build(cells)?;
    vocab.save(config.vocab_path())
}
