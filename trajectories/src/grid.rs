use anyhow::Result;
use serde::{Deserialize, Serialize};

use records::CellID;

/// The eight compass directions, as (row, col) steps.
pub const COMPASS: [(i64, i64); 8] = [
    (0, 1),
    (1, 0),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
];

/// A rectangular grid of `height` rows and `width` columns. Cell ids are `row * width + col`.
/// Both dimensions are always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridDims")]
pub struct Grid {
    height: usize,
    width: usize,
}

#[derive(Deserialize)]
struct GridDims {
    height: usize,
    width: usize,
}

impl TryFrom<GridDims> for Grid {
    type Error = anyhow::Error;

    fn try_from(dims: GridDims) -> Result<Self> {
        Self::new(dims.height, dims.width)
    }
}

impl Grid {
    pub fn new(height: usize, width: usize) -> Result<Self> {
        if height == 0 || width == 0 {
            bail!("A grid can't be {}x{}; both dimensions must be positive", height, width);
        }
        Ok(Self { height, width })
    }

    pub fn num_cells(&self) -> usize {
        self.height * self.width
    }

    pub fn contains(&self, cell: CellID) -> bool {
        cell.0 < self.num_cells()
    }

    pub fn to_row_col(&self, cell: CellID) -> (usize, usize) {
        (cell.0 / self.width, cell.0 % self.width)
    }

    pub fn to_cell(&self, row: usize, col: usize) -> CellID {
        CellID(row * self.width + col)
    }

    /// Moves a cell by `level` steps along `(d_row, d_col)`. If the result would leave the grid,
    /// or the cell isn't on the grid to begin with, the original cell is returned.
    pub fn shift(&self, cell: CellID, (d_row, d_col): (i64, i64), level: i64) -> CellID {
        if !self.contains(cell) {
            return cell;
        }
        let (row, col) = self.to_row_col(cell);
        let row = row as i64 + d_row * level;
        let col = col as i64 + d_col * level;
        if row < 0 || col < 0 || row >= self.height as i64 || col >= self.width as i64 {
            return cell;
        }
        self.to_cell(row as usize, col as usize)
    }
}

impl Default for Grid {
    // The Porto taxi grid
    fn default() -> Self {
        Self {
            height: 51,
            width: 158,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_col() {
        let grid = Grid::new(51, 158).unwrap();
        assert_eq!(grid.to_row_col(CellID(0)), (0, 0));
        assert_eq!(grid.to_row_col(CellID(159)), (1, 1));
        assert_eq!(grid.to_cell(1, 1), CellID(159));
        assert_eq!(grid.to_cell(50, 157), CellID(51 * 158 - 1));
    }

    #[test]
    fn test_shift() {
        let grid = Grid::new(10, 10).unwrap();
        assert_eq!(grid.shift(CellID(55), (1, -1), 2), CellID(73));
        assert_eq!(grid.shift(CellID(55), (-1, 0), 5), CellID(5));
        // Falls off the top
        assert_eq!(grid.shift(CellID(55), (-1, 0), 6), CellID(55));
        // Falls off the right edge instead of wrapping to the next row
        assert_eq!(grid.shift(CellID(9), (0, 1), 1), CellID(9));
        // Off-grid input stays put
        assert_eq!(grid.shift(CellID(250), (-1, 0), 1), CellID(250));
    }

    #[test]
    fn test_shift_stays_on_grid() {
        let grid = Grid::new(4, 7).unwrap();
        for cell in 0..grid.num_cells() {
            for dir in COMPASS {
                for level in -3..=3 {
                    assert!(grid.contains(grid.shift(CellID(cell), dir, level)));
                }
            }
        }
    }

    #[test]
    fn test_empty_grid_rejected() {
        assert!(Grid::new(0, 10).is_err());
        assert!(Grid::new(10, 0).is_err());
        assert_eq!(Grid::new(3, 4).unwrap().num_cells(), 12);

        assert!(serde_json::from_str::<Grid>(r#"{"height": 51, "width": 0}"#).is_err());
        let grid: Grid = serde_json::from_str(r#"{"height": 2, "width": 5}"#).unwrap();
        assert_eq!(grid, Grid::new(2, 5).unwrap());
        assert_eq!(
            serde_json::to_string(&Grid::default()).unwrap(),
            r#"{"height":51,"width":158}"#
        );
    }
}
