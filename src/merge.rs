use hashbrown::HashMap;
use tracing::{info, warn};

use crate::aggregator::{PartialAggregate, ScanStats};
use crate::grid::{CellStats, GridIndex};

pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCell {
    pub id: String,
    pub post_count: u64,
    pub hashtags: Vec<(String, u64)>,
}

/// Cells by post count, busiest first, each with its leading hashtags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedReport {
    pub cells: Vec<RankedCell>,
    pub top_n: usize,
}

pub struct ResultMerger {
    cell_ids: Vec<String>,
    top_n: usize,
}

impl ResultMerger {
    pub fn new(grid: &GridIndex, top_n: usize) -> Self {
        ResultMerger {
            cell_ids: grid.ids().map(str::to_string).collect(),
            top_n,
        }
    }

    /// Sums the partials cell by cell and ranks the result.
    ///
    /// Cells tied on post count keep grid load order. Hashtags are ordered by
    /// frequency, then by text, so the same input always renders the same way.
    pub fn merge(&self, partials: &[PartialAggregate]) -> RankedReport {
        let positions: HashMap<&str, usize> = self
            .cell_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut totals = vec![CellStats::default(); self.cell_ids.len()];
        let mut scanned = ScanStats::default();
        for partial in partials {
            scanned += partial.stats;
            for (id, stats) in &partial.cells {
                match positions.get(id.as_str()) {
                    Some(&i) => totals[i].aggregate(stats),
                    None => warn!(
                        "Worker {} reported unknown cell {}, ignoring it",
                        partial.worker, id
                    ),
                }
            }
        }

        info!(
            "Merged {} partials: {} lines, {} posts in grid, {} outside, {} rejected",
            partials.len(),
            scanned.lines,
            scanned.matched,
            scanned.unclassified,
            scanned.rejected
        );

        let mut cells: Vec<RankedCell> = self
            .cell_ids
            .iter()
            .zip(totals)
            .map(|(id, stats)| RankedCell {
                id: id.clone(),
                post_count: stats.post_count,
                hashtags: top_hashtags(stats.hashtags, self.top_n),
            })
            .collect();
        // sort_by is stable, ties stay in load order
        cells.sort_by(|a, b| b.post_count.cmp(&a.post_count));

        RankedReport {
            cells,
            top_n: self.top_n,
        }
    }
}

/// Keeps every hashtag whose frequency is among the `distinct` highest
/// frequency values, so ties on the last admitted value are all kept.
pub fn top_hashtags(table: HashMap<String, u64>, distinct: usize) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = table.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut budget = distinct;
    let mut previous = None;
    ranked
        .into_iter()
        .take_while(|&(_, freq)| {
            if previous != Some(freq) {
                if budget == 0 {
                    return false;
                }
                budget -= 1;
                previous = Some(freq);
            }
            true
        })
        .collect()
}
