use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::literal::{format_ints, parse_indices};
use crate::CellID;

/// Reads one grid-cell sequence literal per line, like `[12, 13, 171]`. Whitespace-only lines are
/// skipped; anything else that doesn't parse is fatal.
pub fn read_cell_sequences<R: BufRead>(reader: R) -> Result<Vec<Vec<CellID>>> {
    let mut results = Vec::new();
    let mut blank = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            blank += 1;
            continue;
        }
        let cells = parse_indices(&line).with_context(|| format!("line {}", idx + 1))?;
        results.push(cells.into_iter().map(CellID).collect());
    }
    if blank > 0 {
        debug!("Skipped {} blank lines", blank);
    }
    Ok(results)
}

pub fn write_cell_sequences<W: Write>(mut writer: W, trajectories: &[Vec<CellID>]) -> Result<()> {
    for traj in trajectories {
        writeln!(writer, "{}", format_ints(traj))?;
    }
    writer.flush()?;
    Ok(())
}
