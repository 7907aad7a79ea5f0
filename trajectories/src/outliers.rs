//! Synthetic anomalies for taxi trajectories. Both kinds keep the length of their source and
//! never touch the first and last points.
//!
//! - A route-switch outlier independently jitters scattered interior points.
//! - A detour outlier shifts every point of one contiguous interior span by the same offset,
//!   derived from the direction between the span's ends with one axis flipped.
//!
//! Every generation call draws from a random source it's handed (or builds from a seed), so the
//! same seed, sources and parameters always reproduce the same outliers.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use records::CellID;

use crate::grid::{Grid, COMPASS};
use crate::Label;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierKind {
    RouteSwitch,
    Detour,
}

impl OutlierKind {
    pub fn name(self) -> &'static str {
        match self {
            OutlierKind::RouteSwitch => "route_switch",
            OutlierKind::Detour => "detour",
        }
    }

    pub fn label(self) -> Label {
        match self {
            OutlierKind::RouteSwitch => Label::RouteSwitch,
            OutlierKind::Detour => Label::Detour,
        }
    }

    /// Evaluation files are always generated from these, so they're stable across training runs.
    pub fn default_seed(self) -> u64 {
        match self {
            OutlierKind::RouteSwitch => 0,
            OutlierKind::Detour => 10,
        }
    }

    /// The file name encodes every parameter that shapes the output; there's no other versioning.
    pub fn file_name(self, params: &OutlierParams) -> String {
        format!("{}.csv", self.stem(params))
    }

    /// Where outliers generated with randomly nudged parameters go. The nominal parameters in
    /// the name don't describe the contents, so datasets never load these.
    pub fn varied_file_name(self, params: &OutlierParams) -> String {
        format!("{}_vary.csv", self.stem(params))
    }

    fn stem(self, params: &OutlierParams) -> String {
        format!(
            "{}_ratio_{}_level_{}_prob_{}",
            self.name(),
            format_param(params.ratio),
            params.level,
            format_param(params.prob)
        )
    }
}

impl fmt::Display for OutlierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OutlierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "route_switch" => Ok(OutlierKind::RouteSwitch),
            "detour" => Ok(OutlierKind::Detour),
            x => bail!("Unknown outlier kind {:?}", x),
        }
    }
}

// 0.3 stays "0.3", but 1 becomes "1.0"
fn format_param(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierParams {
    /// Fraction of the real trajectories to sample (with replacement) as sources
    pub ratio: f64,
    /// Severity: how many cells each perturbation moves
    pub level: i64,
    /// Per-point chance of a route switch, or the fraction of the interior a detour covers
    pub prob: f64,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            ratio: 0.05,
            level: 3,
            prob: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutlierError {
    TooShort { len: usize },
    SpanTooLong { len: usize, span: usize },
}

impl fmt::Display for OutlierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => {
                write!(f, "a detour needs at least 3 points, but the trajectory has {len}")
            }
            Self::SpanTooLong { len, span } => write!(
                f,
                "a detour span of {span} leaves no interior start in a trajectory of {len}"
            ),
        }
    }
}

impl std::error::Error for OutlierError {}

pub fn route_switch<R: Rng>(
    traj: &[CellID],
    grid: &Grid,
    level: i64,
    prob: f64,
    rng: &mut R,
) -> Vec<CellID> {
    if traj.len() <= 2 {
        return traj.to_vec();
    }
    let last = traj.len() - 1;
    let mut result = Vec::with_capacity(traj.len());
    result.push(traj[0]);
    for cell in &traj[1..last] {
        // Cell 0 is reserved. Don't draw for it at all.
        if cell.0 != 0 && rng.gen::<f64>() < prob {
            let dir = COMPASS[rng.gen_range(0..COMPASS.len())];
            result.push(grid.shift(*cell, dir, level));
        } else {
            result.push(*cell);
        }
    }
    result.push(traj[last]);
    result
}

pub struct Detour {
    pub cells: Vec<CellID>,
    /// The shifted points. Everything outside this is copied from the source.
    pub span: Range<usize>,
}

pub fn detour<R: Rng>(
    traj: &[CellID],
    grid: &Grid,
    level: i64,
    prob: f64,
    rng: &mut R,
) -> Result<Detour, OutlierError> {
    let len = traj.len();
    if len < 3 {
        return Err(OutlierError::TooShort { len });
    }
    let span = ((len - 2) as f64 * prob).max(0.0).floor() as usize;
    if span + 2 >= len {
        return Err(OutlierError::SpanTooLong { len, span });
    }
    let start = rng.gen_range(1..len - span - 1);
    let end = start + span;

    let (start_row, start_col) = grid.to_row_col(traj[start]);
    let (end_row, end_col) = grid.to_row_col(traj[end]);
    // Each axis is divided by its own magnitude, or by 1 when it's 0, so every step is -1, 0 or 1
    let d_row = start_row as i64 - end_row as i64;
    let d_col = start_col as i64 - end_col as i64;
    let d_row = d_row / d_row.abs().max(1);
    let d_col = d_col / d_col.abs().max(1);
    let dir = if rng.gen::<f64>() < 0.5 {
        (-d_row, d_col)
    } else {
        (d_row, -d_col)
    };

    let mut cells = traj.to_vec();
    for cell in &mut cells[start..end] {
        *cell = grid.shift(*cell, dir, level);
    }
    Ok(Detour {
        cells,
        span: start..end,
    })
}

/// Nudges detour parameters to diversify synthesis runs. Never use this for evaluation sets.
pub fn vary_params<R: Rng>(level: i64, prob: f64, rng: &mut R) -> (i64, f64) {
    let level = level + rng.gen_range(-2..3);
    let prob = if rng.gen::<f64>() > 0.5 {
        prob + 0.2 * rng.gen::<f64>()
    } else {
        prob - 0.2 * rng.gen::<f64>()
    };
    (level, prob)
}

pub struct Synthesized {
    pub kind: OutlierKind,
    pub trajectories: Vec<Vec<CellID>>,
    /// Sampled sources that couldn't produce this kind of outlier
    pub rejected: usize,
    /// True if the parameters were nudged away from the nominal ones
    pub varied: bool,
}

/// Generates outliers on a fixed grid. Holds no random state of its own.
pub struct Synthesizer {
    grid: Grid,
}

impl Synthesizer {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    /// `vary` only affects detours.
    pub fn generate(
        &self,
        sources: &[Vec<CellID>],
        kind: OutlierKind,
        params: &OutlierParams,
        seed: u64,
        vary: bool,
    ) -> Synthesized {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate_with_rng(sources, kind, params, vary, &mut rng)
    }

    pub fn generate_with_rng<R: Rng>(
        &self,
        sources: &[Vec<CellID>],
        kind: OutlierKind,
        params: &OutlierParams,
        vary: bool,
        rng: &mut R,
    ) -> Synthesized {
        // Sources are sampled with replacement, all up-front
        let count = (sources.len() as f64 * params.ratio).max(0.0).floor() as usize;
        let picks: Vec<usize> = if sources.is_empty() {
            Vec::new()
        } else {
            (0..count).map(|_| rng.gen_range(0..sources.len())).collect()
        };

        let mut trajectories = Vec::new();
        let mut rejected = 0;
        let mut varied = false;
        match kind {
            OutlierKind::RouteSwitch => {
                for idx in picks {
                    trajectories.push(route_switch(
                        &sources[idx],
                        &self.grid,
                        params.level,
                        params.prob,
                        rng,
                    ));
                }
            }
            OutlierKind::Detour => {
                let (level, prob) = if vary {
                    varied = true;
                    vary_params(params.level, params.prob, rng)
                } else {
                    (params.level, params.prob)
                };
                for idx in picks {
                    match detour(&sources[idx], &self.grid, level, prob, rng) {
                        Ok(d) => trajectories.push(d.cells),
                        Err(err) => {
                            debug!("Source trajectory {} can't be a detour: {}", idx, err);
                            rejected += 1;
                        }
                    }
                }
            }
        }

        if rejected > 0 {
            warn!("{} sampled sources couldn't produce a {} outlier", rejected, kind);
        }
        info!(
            "Generated {} {} outliers from {} sources",
            trajectories.len(),
            kind,
            sources.len()
        );
        Synthesized {
            kind,
            trajectories,
            rejected,
            varied,
        }
    }
}
