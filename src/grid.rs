use hashbrown::{HashMap, HashSet};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

use crate::error::{HistogramError, Result};

/// Longitude/latitude of a post.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Coordinate { x, y }
    }
}

/// Rectangle inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Bounds {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Bounds {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point.x >= self.xmin
            && point.x <= self.xmax
            && point.y >= self.ymin
            && point.y <= self.ymax
    }
}

/// CellStats holds the running post count and hashtag frequencies of one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellStats {
    pub post_count: u64,
    pub hashtags: HashMap<String, u64>,
}

impl CellStats {
    pub fn record_post(&mut self) {
        self.post_count += 1;
    }

    /// One increment per distinct hashtag of a post.
    pub fn record_hashtags<'a>(&mut self, hashtags: impl IntoIterator<Item = &'a String>) {
        for tag in hashtags {
            *self.hashtags.entry_ref(tag.as_str()).or_insert(0) += 1;
        }
    }

    /// Aggregates data from another CellStats instance.
    pub fn aggregate(&mut self, other: &CellStats) {
        self.post_count += other.post_count;
        for (tag, freq) in &other.hashtags {
            *self.hashtags.entry_ref(tag.as_str()).or_insert(0) += freq;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: String,
    pub bounds: Bounds,
    pub stats: CellStats,
}

/// The grid in load order.
///
/// Load order matters twice: `classify` returns the first matching cell, and the
/// merged report breaks post-count ties by it. Cells are assumed not to overlap;
/// when they do, the earlier cell silently wins.
#[derive(Debug, Clone, PartialEq)]
pub struct GridIndex {
    cells: Vec<Cell>,
}

#[derive(Deserialize)]
struct GridFile {
    features: Vec<GridFeature>,
}

#[derive(Deserialize)]
struct GridFeature {
    properties: CellProperties,
}

#[derive(Deserialize)]
struct CellProperties {
    id: String,
    #[serde(flatten)]
    bounds: Bounds,
}

impl GridIndex {
    pub fn new<I, S>(cells: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Bounds)>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut built = Vec::new();
        for (id, bounds) in cells {
            let id = id.into();
            if bounds.xmin > bounds.xmax || bounds.ymin > bounds.ymax {
                return Err(HistogramError::InvalidGrid(format!(
                    "cell {} has inverted bounds {:?}",
                    id, bounds
                )));
            }
            if !seen.insert(id.clone()) {
                return Err(HistogramError::InvalidGrid(format!(
                    "cell {} is defined more than once",
                    id
                )));
            }
            built.push(Cell {
                id,
                bounds,
                stats: CellStats::default(),
            });
        }

        if built.is_empty() {
            return Err(HistogramError::InvalidGrid("grid has no cells".to_string()));
        }

        Ok(GridIndex { cells: built })
    }

    /// Reads a GeoJSON-style grid: `features[].properties` with `id`, `xmin`,
    /// `xmax`, `ymin` and `ymax`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| HistogramError::config_load(path, e))?;
        let grid: GridFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| HistogramError::config_load(path, e))?;

        let index = GridIndex::new(
            grid.features
                .into_iter()
                .map(|feature| (feature.properties.id, feature.properties.bounds)),
        )
        .map_err(|e| HistogramError::config_load(path, e))?;
        debug!("Loaded {} grid cells from {}", index.len(), path.display());
        Ok(index)
    }

    /// Same cells, zeroed statistics; one per worker.
    pub fn fresh(&self) -> Self {
        GridIndex {
            cells: self
                .cells
                .iter()
                .map(|cell| Cell {
                    id: cell.id.clone(),
                    bounds: cell.bounds,
                    stats: CellStats::default(),
                })
                .collect(),
        }
    }

    pub fn classify(&self, coordinate: Option<Coordinate>) -> Option<usize> {
        let point = coordinate?;
        self.cells.iter().position(|cell| cell.bounds.contains(point))
    }

    pub fn record_post(&mut self, cell: usize) {
        self.cells[cell].stats.record_post();
    }

    pub fn record_hashtags<'a>(
        &mut self,
        cell: usize,
        hashtags: impl IntoIterator<Item = &'a String>,
    ) {
        self.cells[cell].stats.record_hashtags(hashtags);
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|cell| cell.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Consumes the index into the id -> statistics table a worker hands back.
    pub fn snapshot(self) -> HashMap<String, CellStats> {
        self.cells
            .into_iter()
            .map(|cell| (cell.id, cell.stats))
            .collect()
    }
}
