//! Per-cell shortcut storage and metric.
//!
//! Topology (which boundary nodes a cell has) and metric (the shortcut
//! weights/durations between them) are kept in separate structs and combined
//! into a borrowed [`CellView`] at query time, so one storage can serve
//! several metrics.
//!
//! Per cell the metric holds a row-major `|sources| x |destinations|` block:
//! `out_*` streams are contiguous rows, `in_*` streams are strided columns.
//! Both are positionally aligned with the boundary node lists.

use crate::types::{CellId, EdgeDuration, EdgeWeight, LevelId, NodeId};

/// Boundary-node topology for all cells of all levels.
#[derive(Debug, Clone)]
pub struct CellStorage {
    levels: Vec<LevelCells>,
}

#[derive(Debug, Clone)]
struct LevelCells {
    /// Per cell c: `source_offsets[c]..source_offsets[c + 1]` into `source_nodes`.
    source_offsets: Vec<u32>,
    destination_offsets: Vec<u32>,
    source_nodes: Vec<NodeId>,
    destination_nodes: Vec<NodeId>,
    /// Per cell: offset of its |src| x |dst| block in the metric arrays.
    matrix_offsets: Vec<u32>,
}

/// Shortcut costs aligned with a [`CellStorage`].
#[derive(Debug, Clone)]
pub struct CellMetric {
    pub weights: Vec<EdgeWeight>,
    pub durations: Vec<EdgeDuration>,
}

/// Borrowed view of one cell combined with one metric.
pub struct CellView<'a> {
    source_nodes: &'a [NodeId],
    destination_nodes: &'a [NodeId],
    weights: &'a [EdgeWeight],
    durations: &'a [EdgeDuration],
}

impl CellStorage {
    pub fn new(levels: Vec<CellStorageLevelBuilder>) -> Self {
        let mut matrix_base = 0u32;
        let levels = levels
            .into_iter()
            .map(|level| {
                let mut matrix_offsets = Vec::with_capacity(level.source_offsets.len() - 1);
                for c in 0..level.source_offsets.len() - 1 {
                    matrix_offsets.push(matrix_base);
                    let n_src = level.source_offsets[c + 1] - level.source_offsets[c];
                    let n_dst = level.destination_offsets[c + 1] - level.destination_offsets[c];
                    matrix_base += n_src * n_dst;
                }
                LevelCells {
                    source_offsets: level.source_offsets,
                    destination_offsets: level.destination_offsets,
                    source_nodes: level.source_nodes,
                    destination_nodes: level.destination_nodes,
                    matrix_offsets,
                }
            })
            .collect();
        CellStorage { levels }
    }

    /// Total number of metric entries the aligned [`CellMetric`] must hold.
    pub fn metric_entries(&self) -> usize {
        self.levels
            .last()
            .and_then(|level| {
                let c = level.matrix_offsets.len().checked_sub(1)?;
                let n_src = (level.source_offsets[c + 1] - level.source_offsets[c]) as usize;
                let n_dst =
                    (level.destination_offsets[c + 1] - level.destination_offsets[c]) as usize;
                Some(level.matrix_offsets[c] as usize + n_src * n_dst)
            })
            .unwrap_or(0)
    }

    /// Block offset plus boundary lists of `cell_id` at `level`, combined
    /// with `metric` into a view.
    pub fn get_cell<'a>(
        &'a self,
        metric: &'a CellMetric,
        level: LevelId,
        cell_id: CellId,
    ) -> CellView<'a> {
        debug_assert!(level >= 1);
        let level = &self.levels[level as usize - 1];
        let c = cell_id as usize;
        let src = level.source_offsets[c] as usize..level.source_offsets[c + 1] as usize;
        let dst = level.destination_offsets[c] as usize..level.destination_offsets[c + 1] as usize;
        let base = level.matrix_offsets[c] as usize;
        let len = src.len() * dst.len();
        CellView {
            source_nodes: &level.source_nodes[src],
            destination_nodes: &level.destination_nodes[dst],
            weights: &metric.weights[base..base + len],
            durations: &metric.durations[base..base + len],
        }
    }
}

/// Per-level input to [`CellStorage::new`]; offsets are CSR-style with one
/// trailing entry per array.
pub struct CellStorageLevelBuilder {
    pub source_offsets: Vec<u32>,
    pub destination_offsets: Vec<u32>,
    pub source_nodes: Vec<NodeId>,
    pub destination_nodes: Vec<NodeId>,
}

impl<'a> CellView<'a> {
    #[inline]
    pub fn source_nodes(&self) -> &'a [NodeId] {
        self.source_nodes
    }

    #[inline]
    pub fn destination_nodes(&self) -> &'a [NodeId] {
        self.destination_nodes
    }

    #[inline]
    fn source_index(&self, node: NodeId) -> Option<usize> {
        self.source_nodes.iter().position(|&n| n == node)
    }

    #[inline]
    fn destination_index(&self, node: NodeId) -> Option<usize> {
        self.destination_nodes.iter().position(|&n| n == node)
    }

    /// Shortcut weights from source-boundary `node` to every destination
    /// node, positionally aligned with `destination_nodes()`. Empty when
    /// `node` is not a source-boundary node of this cell.
    pub fn out_weight(&self, node: NodeId) -> &'a [EdgeWeight] {
        match self.source_index(node) {
            Some(row) => {
                let n_dst = self.destination_nodes.len();
                &self.weights[row * n_dst..(row + 1) * n_dst]
            }
            None => &[],
        }
    }

    pub fn out_duration(&self, node: NodeId) -> &'a [EdgeDuration] {
        match self.source_index(node) {
            Some(row) => {
                let n_dst = self.destination_nodes.len();
                &self.durations[row * n_dst..(row + 1) * n_dst]
            }
            None => &[],
        }
    }

    /// Shortcut weights from every source node into destination-boundary
    /// `node`, positionally aligned with `source_nodes()`. Empty when `node`
    /// is not a destination-boundary node of this cell.
    pub fn in_weight(&self, node: NodeId) -> impl Iterator<Item = EdgeWeight> + 'a {
        let n_dst = self.destination_nodes.len().max(1);
        let column = self.destination_index(node);
        let weights = self.weights;
        column
            .map(move |col| {
                // A cell without sources has an empty matrix for any column.
                weights.get(col..).unwrap_or(&[]).iter().step_by(n_dst).copied()
            })
            .into_iter()
            .flatten()
    }

    pub fn in_duration(&self, node: NodeId) -> impl Iterator<Item = EdgeDuration> + 'a {
        let n_dst = self.destination_nodes.len().max(1);
        let column = self.destination_index(node);
        let durations = self.durations;
        column
            .map(move |col| {
                durations.get(col..).unwrap_or(&[]).iter().step_by(n_dst).copied()
            })
            .into_iter()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> (CellStorage, CellMetric) {
        // One level, one cell: sources {0, 1}, destinations {2, 3}.
        let storage = CellStorage::new(vec![CellStorageLevelBuilder {
            source_offsets: vec![0, 2],
            destination_offsets: vec![0, 2],
            source_nodes: vec![0, 1],
            destination_nodes: vec![2, 3],
        }]);
        let metric = CellMetric {
            weights: vec![10, 11, 20, 21],
            durations: vec![100, 110, 200, 210],
        };
        (storage, metric)
    }

    #[test]
    fn out_streams_are_rows() {
        let (storage, metric) = two_by_two();
        let cell = storage.get_cell(&metric, 1, 0);

        assert_eq!(cell.out_weight(0), &[10, 11]);
        assert_eq!(cell.out_weight(1), &[20, 21]);
        assert_eq!(cell.out_duration(1), &[200, 210]);
        assert!(cell.out_weight(2).is_empty());
    }

    #[test]
    fn in_streams_are_columns() {
        let (storage, metric) = two_by_two();
        let cell = storage.get_cell(&metric, 1, 0);

        assert_eq!(cell.in_weight(2).collect::<Vec<_>>(), vec![10, 20]);
        assert_eq!(cell.in_weight(3).collect::<Vec<_>>(), vec![11, 21]);
        assert_eq!(cell.in_duration(2).collect::<Vec<_>>(), vec![100, 200]);
        assert_eq!(cell.in_weight(0).count(), 0);
    }
}
