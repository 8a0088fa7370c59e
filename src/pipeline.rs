use memmap::{Mmap, MmapOptions};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::aggregator::{PartialAggregate, PartitionAggregator, RecordSource};
use crate::config::HistogramConfig;
use crate::error::{HistogramError, Result};
use crate::grid::GridIndex;
use crate::merge::{RankedReport, ResultMerger};
use crate::partition::plan;
use crate::record::RecordParser;

/// Plans ranges, scans them on a fixed worker pool and merges the partials.
pub struct Histogram {
    grid: GridIndex,
    parser: RecordParser,
    workers: usize,
    top_n: usize,
}

// Read-only view of the input. Zero-length files cannot be mapped.
enum InputBytes {
    Mapped(Mmap),
    Empty,
}

impl InputBytes {
    fn open(path: &Path) -> Result<Self> {
        let input_error = |source: io::Error| HistogramError::Input {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(input_error)?;
        let len = file.metadata().map_err(input_error)?.len();
        if len == 0 {
            return Ok(InputBytes::Empty);
        }
        // The mapping is only read, and only for the length of the run.
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(input_error)?;
        Ok(InputBytes::Mapped(mmap))
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            InputBytes::Mapped(mmap) => &mmap[..],
            InputBytes::Empty => &[],
        }
    }
}

impl Histogram {
    pub fn new(grid: GridIndex, config: &HistogramConfig) -> Result<Self> {
        config.validate()?;
        Ok(Histogram {
            grid,
            parser: RecordParser::new(config.hashtag_delimiter),
            workers: config.workers,
            top_n: config.top_n,
        })
    }

    /// Loads the grid named by `config` and validates the rest of it.
    pub fn from_config(config: &HistogramConfig) -> Result<Self> {
        let grid = GridIndex::load(&config.grid_path)?;
        Histogram::new(grid, config)
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<RankedReport> {
        let path = path.as_ref();
        let start = Instant::now();

        let input = InputBytes::open(path)?;
        let bytes = input.as_slice();
        info!(
            "Scanning {} ({} bytes) with {} workers",
            path.display(),
            bytes.len(),
            self.workers
        );

        let report = self.run_source(|| Ok(Cursor::new(bytes)))?;
        info!("Finished {} in {:?}", path.display(), start.elapsed());
        Ok(report)
    }

    /// Runs over any record source. `open` is called once for planning and once
    /// per worker, so every worker reads through its own handle.
    pub fn run_source<S, F>(&self, open: F) -> Result<RankedReport>
    where
        S: RecordSource,
        F: Fn() -> io::Result<S> + Sync,
    {
        let partials = self.scan(open)?;
        Ok(ResultMerger::new(&self.grid, self.top_n).merge(&partials))
    }

    pub fn scan<S, F>(&self, open: F) -> Result<Vec<PartialAggregate>>
    where
        S: RecordSource,
        F: Fn() -> io::Result<S> + Sync,
    {
        let size = open()
            .and_then(|mut source| source.size())
            .map_err(|source| HistogramError::Input {
                path: "<record source>".into(),
                source,
            })?;
        let ranges = plan(size, self.workers)?;
        debug!("Planned ranges: {:?}", ranges);

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("histogram-worker-{}", i))
            .build()?;

        let results: Vec<Result<PartialAggregate>> = pool.install(|| {
            ranges
                .par_iter()
                .enumerate()
                .map(|(worker, &range)| {
                    let mut source = open().map_err(|source| HistogramError::Worker {
                        worker,
                        range,
                        source,
                    })?;
                    PartitionAggregator::new(worker, range, &self.grid, &self.parser)
                        .run(&mut source)
                })
                .collect()
        });

        gather(results, ranges.len())
    }
}

/// Barrier between scan and merge: every worker must have delivered.
pub fn gather(
    results: Vec<Result<PartialAggregate>>,
    expected: usize,
) -> Result<Vec<PartialAggregate>> {
    let partials = results.into_iter().collect::<Result<Vec<_>>>()?;
    // Always equal for the in-process pool; guards any other source of partials.
    if partials.len() != expected {
        return Err(HistogramError::Transport {
            expected,
            received: partials.len(),
        });
    }
    Ok(partials)
}
