//! Multi-level graph partition.
//!
//! Level 0 is the base graph where every node is its own cell. Levels
//! `1..number_of_levels()` carry one cell id per node, and cells nest: two
//! nodes sharing a cell at level `l` share a cell at every level above `l`.

use crate::types::{CellId, LevelId, NodeId};

#[derive(Debug, Clone)]
pub struct MultiLevelPartition {
    /// `cells[l - 1][node]` is the cell of `node` at level `l`.
    cells: Vec<Vec<CellId>>,
    /// Number of cells per stored level, aligned with `cells`.
    cell_counts: Vec<u32>,
}

impl MultiLevelPartition {
    /// `cells[l - 1]` assigns every node a cell id at level `l`. Nesting is
    /// the caller's responsibility; the test builder validates it.
    pub fn new(cells: Vec<Vec<CellId>>) -> Self {
        let cell_counts = cells
            .iter()
            .map(|level| level.iter().max().map_or(0, |max| max + 1))
            .collect();
        MultiLevelPartition { cells, cell_counts }
    }

    /// Number of levels including the base level 0.
    #[inline]
    pub fn number_of_levels(&self) -> LevelId {
        self.cells.len() as LevelId + 1
    }

    #[inline]
    pub fn number_of_cells(&self, level: LevelId) -> u32 {
        self.cell_counts[level as usize - 1]
    }

    /// Cell of `node` at `level`. Level must be at least 1.
    #[inline]
    pub fn cell(&self, level: LevelId, node: NodeId) -> CellId {
        debug_assert!(level >= 1);
        self.cells[level as usize - 1][node as usize]
    }

    /// Highest level at which `a` and `b` live in different cells; 0 when
    /// they share a cell on every stored level. Cells nest, so this scans
    /// from the top down and stops at the first difference.
    #[inline]
    pub fn highest_different_level(&self, a: NodeId, b: NodeId) -> LevelId {
        for level in (1..=self.cells.len() as LevelId).rev() {
            if self.cell(level, a) != self.cell(level, b) {
                return level;
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_different_level_scans_top_down() {
        // 4 nodes, two levels: level 1 pairs {0,1} {2,3}, level 2 all in one.
        let partition = MultiLevelPartition::new(vec![vec![0, 0, 1, 1], vec![0, 0, 0, 0]]);

        assert_eq!(partition.number_of_levels(), 3);
        assert_eq!(partition.highest_different_level(0, 1), 0);
        assert_eq!(partition.highest_different_level(0, 2), 1);
        assert_eq!(partition.highest_different_level(0, 0), 0);
    }

    #[test]
    fn cell_lookup() {
        let partition = MultiLevelPartition::new(vec![vec![0, 1, 1]]);
        assert_eq!(partition.cell(1, 0), 0);
        assert_eq!(partition.cell(1, 2), 1);
        assert_eq!(partition.number_of_cells(1), 2);
    }
}
