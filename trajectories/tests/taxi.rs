use std::path::Path;

use tempfile::TempDir;

use records::{write_cell_sequences, CellID};
use trajectories::{
    Grid, Label, OutlierKind, OutlierParams, Sequence, TaxiConfig, TaxiDataset, TrajectoryDataset,
    Vocabulary,
};

fn cells(ids: &[usize]) -> Vec<CellID> {
    ids.iter().map(|x| CellID(*x)).collect()
}

// Trajectories on a 10x10 grid, away from the edges
fn real() -> Vec<Vec<CellID>> {
    vec![
        cells(&[11, 12, 13, 14, 24, 34, 44, 45]),
        cells(&[22, 33, 44, 55, 66, 77]),
        cells(&[31, 32, 33, 43, 53, 63, 64, 65, 66, 67]),
        cells(&[18, 27, 36, 45]),
        cells(&[51, 52]),
    ]
}

fn write_file(path: &Path, trajectories: &[Vec<CellID>]) {
    let file = std::fs::File::create(path).unwrap();
    write_cell_sequences(file, trajectories).unwrap();
}

fn setup(kinds: Vec<OutlierKind>) -> (TempDir, TaxiConfig) {
    let dir = TempDir::new().unwrap();
    let config = TaxiConfig {
        data_dir: dir.path().to_path_buf(),
        grid: Grid::new(10, 10).unwrap(),
        outliers: OutlierParams {
            ratio: 1.0,
            level: 1,
            prob: 0.5,
        },
        outlier_kinds: kinds,
        ..Default::default()
    };
    write_file(&config.source_path(), &real());
    Vocabulary::build((0..100).map(|x| x.to_string()))
        .unwrap()
        .save(config.vocab_path())
        .unwrap();
    (dir, config)
}

#[test]
fn test_real_only() {
    let (_dir, config) = setup(Vec::new());
    let ds = TaxiDataset::load(config).unwrap();
    assert_eq!(ds.len(), 5);
    assert_eq!(ds.block_size(), 12);
    let (label, seq) = ds.get(4).unwrap();
    assert_eq!(label, Label::NonOutlier);
    assert_eq!(
        seq,
        Sequence::Symbols(vec![
            "SOT".to_string(),
            "51".to_string(),
            "52".to_string(),
            "EOT".to_string()
        ])
    );
}

#[test]
fn test_missing_outlier_file_is_fatal() {
    let (_dir, config) = setup(vec![OutlierKind::RouteSwitch]);
    let err = TaxiDataset::load(config.clone()).err().unwrap();
    assert!(err.to_string().contains("route_switch_ratio_1.0_level_1_prob_0.5.csv"));

    // Nothing's needed when outliers are excluded
    let ds = TaxiDataset::load(TaxiConfig {
        include_outliers: false,
        ..config
    })
    .unwrap();
    assert_eq!(ds.len(), 5);
}

#[test]
fn test_outlier_files_appended() {
    let (_dir, config) = setup(vec![OutlierKind::RouteSwitch, OutlierKind::Detour]);
    std::fs::create_dir_all(config.outlier_dir()).unwrap();
    write_file(
        &config.outlier_path(OutlierKind::RouteSwitch),
        &[cells(&[11, 22, 13]), cells(&[0; 11])],
    );
    write_file(
        &config.outlier_path(OutlierKind::Detour),
        &[cells(&[22, 43, 54, 66])],
    );

    let ds = TaxiDataset::load(config).unwrap();
    let report = ds.report();
    assert_eq!(report.real, 5);
    assert_eq!(report.outliers_added, 2);
    assert_eq!(report.skipped_long, 1);
    assert_eq!(ds.len(), 7);
    assert_eq!(ds.get(5).unwrap().0, Label::RouteSwitch);
    assert_eq!(ds.get(6).unwrap().0, Label::Detour);

    let batch = ds.batch(&[6, 4, 2]).unwrap();
    assert_eq!(
        batch.metadata,
        vec![Label::Detour, Label::NonOutlier, Label::NonOutlier]
    );
    assert_eq!(batch.width(), 12);
    assert_eq!(batch.true_lengths(), vec![6, 4, 12]);
}

#[test]
fn test_vocab_needs_sot() {
    let (_dir, config) = setup(Vec::new());
    let vocab = Vocabulary::new(
        [("PAD", 0), ("EOT", 1)]
            .into_iter()
            .map(|(s, id)| (s.to_string(), trajectories::TokenID(id)))
            .collect(),
    )
    .unwrap();
    vocab.save(config.vocab_path()).unwrap();
    assert!(TaxiDataset::load(config).is_err());
}

#[test]
fn test_generate_write_reload() {
    let (_dir, config) = setup(vec![OutlierKind::RouteSwitch, OutlierKind::Detour]);
    let kinds = config.outlier_kinds.clone();
    let ds = TaxiDataset::load(TaxiConfig {
        include_outliers: false,
        ..config.clone()
    })
    .unwrap();

    let batches = ds.generate_outliers(&kinds, false);
    assert_eq!(batches.len(), 2);
    let route_switch = &batches[0];
    assert_eq!(route_switch.kind, OutlierKind::RouteSwitch);
    assert_eq!(route_switch.trajectories.len(), 5);
    let detour = &batches[1];
    // Every sampled two-point trajectory is rejected
    assert_eq!(detour.trajectories.len() + detour.rejected, 5);

    // Generation is reproducible
    let again = ds.generate_outliers(&kinds, false);
    assert_eq!(again[0].trajectories, route_switch.trajectories);
    assert_eq!(again[1].trajectories, detour.trajectories);

    for batch in &batches {
        for traj in &batch.trajectories {
            assert!(real().iter().any(|r| r.len() == traj.len()
                && r.first() == traj.first()
                && r.last() == traj.last()));
            assert!(traj.iter().all(|c| c.0 < 100));
        }
    }

    let paths = ds.write_outliers(&batches).unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.exists()));

    let reloaded = TaxiDataset::load(config).unwrap();
    assert_eq!(
        reloaded.len(),
        5 + route_switch.trajectories.len() + detour.trajectories.len()
    );
    assert_eq!(reloaded.report().skipped_long, 0);
    for idx in 0..reloaded.len() {
        let (_, seq) = reloaded.get(idx).unwrap();
        assert!(seq.encode(reloaded.vocab()).is_ok());
    }
}

#[test]
fn test_varied_outliers_never_replace_evaluation_files() {
    let (_dir, config) = setup(vec![OutlierKind::Detour]);
    let ds = TaxiDataset::load(TaxiConfig {
        include_outliers: false,
        ..config.clone()
    })
    .unwrap();

    let plain = ds.generate_outliers(&[OutlierKind::Detour], false);
    let plain_paths = ds.write_outliers(&plain).unwrap();
    assert_eq!(plain_paths, vec![config.outlier_path(OutlierKind::Detour)]);
    let evaluation = std::fs::read_to_string(&plain_paths[0]).unwrap();

    let varied = ds.generate_outliers(&[OutlierKind::Detour], true);
    assert!(varied[0].varied);
    let varied_paths = ds.write_outliers(&varied).unwrap();
    assert_eq!(
        varied_paths,
        vec![config.varied_outlier_path(OutlierKind::Detour)]
    );
    assert!(varied_paths[0].exists());

    // The evaluation set is untouched and is still what loading picks up
    assert_eq!(
        std::fs::read_to_string(config.outlier_path(OutlierKind::Detour)).unwrap(),
        evaluation
    );
    let reloaded = TaxiDataset::load(config).unwrap();
    assert_eq!(
        reloaded.report().outliers_added,
        plain[0].trajectories.len()
    );
}

#[test]
fn test_datasets_are_shareable() {
    fn assert_sync<T: Send + Sync>() {}
    assert_sync::<TaxiDataset>();
    assert_sync::<trajectories::CheckinDataset>();
}
