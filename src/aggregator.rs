use hashbrown::HashMap;
use std::io::{self, BufRead, Seek, SeekFrom};
use std::ops::AddAssign;
use tracing::{debug, info, trace};

use crate::error::{HistogramError, Result};
use crate::grid::{CellStats, GridIndex};
use crate::partition::ByteRange;
use crate::record::RecordParser;

/// A seekable stream of newline-terminated records.
pub trait RecordSource {
    /// Total length of the stream in bytes.
    fn size(&mut self) -> io::Result<u64>;

    fn seek_to(&mut self, offset: u64) -> io::Result<()>;

    /// Appends the next line, terminator included, to `buf`. Returns the number
    /// of bytes consumed; 0 at end of stream.
    fn next_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;
}

impl<T: BufRead + Seek> RecordSource for T {
    fn size(&mut self) -> io::Result<u64> {
        let current = self.stream_position()?;
        let size = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current))?;
        Ok(size)
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    fn next_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.read_until(b'\n', buf)
    }
}

/// Per-worker counters, reported in logs only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub lines: u64,
    pub rejected: u64,
    pub unclassified: u64,
    pub matched: u64,
}

impl AddAssign for ScanStats {
    fn add_assign(&mut self, other: ScanStats) {
        self.lines += other.lines;
        self.rejected += other.rejected;
        self.unclassified += other.unclassified;
        self.matched += other.matched;
    }
}

/// One worker's statistics after scanning its range.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialAggregate {
    pub worker: usize,
    pub cells: HashMap<String, CellStats>,
    pub stats: ScanStats,
}

pub struct PartitionAggregator<'a> {
    worker: usize,
    range: ByteRange,
    grid: GridIndex,
    parser: &'a RecordParser,
    stats: ScanStats,
}

impl<'a> PartitionAggregator<'a> {
    /// The aggregator owns a zeroed copy of `grid` for the length of the scan.
    pub fn new(
        worker: usize,
        range: ByteRange,
        grid: &GridIndex,
        parser: &'a RecordParser,
    ) -> Self {
        PartitionAggregator {
            worker,
            range,
            grid: grid.fresh(),
            parser,
            stats: ScanStats::default(),
        }
    }

    /// Streams whole lines starting at `range.start` until the position reaches
    /// `range.end`. The last line read may run past `end`; the first one may be
    /// the tail of a record owned by the previous worker and is rejected by the
    /// parser like any other fragment.
    pub fn run<S: RecordSource>(mut self, source: &mut S) -> Result<PartialAggregate> {
        debug!("Worker {} scanning bytes {}", self.worker, self.range);

        source
            .seek_to(self.range.start)
            .map_err(|e| self.failure(e))?;

        let mut position = self.range.start;
        let mut line = Vec::with_capacity(4096);
        while position < self.range.end {
            line.clear();
            let read = source.next_line(&mut line).map_err(|e| self.failure(e))?;
            if read == 0 {
                break;
            }
            position += read as u64;
            self.process_line(&line);
        }

        info!(
            "Worker {} done: {} lines, {} matched, {} outside grid, {} rejected",
            self.worker,
            self.stats.lines,
            self.stats.matched,
            self.stats.unclassified,
            self.stats.rejected
        );

        Ok(PartialAggregate {
            worker: self.worker,
            cells: self.grid.snapshot(),
            stats: self.stats,
        })
    }

    fn process_line(&mut self, line: &[u8]) {
        self.stats.lines += 1;

        let Ok(text) = std::str::from_utf8(line) else {
            trace!("Worker {} skipping non UTF-8 line", self.worker);
            self.stats.rejected += 1;
            return;
        };

        let record = match self.parser.parse(text) {
            Ok(record) => record,
            Err(reason) => {
                trace!("Worker {} skipping line: {}", self.worker, reason);
                self.stats.rejected += 1;
                return;
            }
        };

        match self.grid.classify(record.coordinate) {
            Some(cell) => {
                self.grid.record_post(cell);
                self.grid.record_hashtags(cell, &record.hashtags);
                self.stats.matched += 1;
            }
            None => self.stats.unclassified += 1,
        }
    }

    fn failure(&self, source: io::Error) -> HistogramError {
        HistogramError::Worker {
            worker: self.worker,
            range: self.range,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::tests::square_grid;
    use crate::partition::plan;
    use std::io::Cursor;

    fn line(x: f64, y: f64, text: &str) -> String {
        format!(
            "{{\"doc\":{{\"coordinates\":{{\"coordinates\":[{:?},{:?}]}},\"text\":\"{}\"}}}},\n",
            x, y, text
        )
    }

    fn corpus() -> Vec<u8> {
        let mut data = String::from("[\n");
        data.push_str(&line(0.5, 1.5, "go #blue and #blue again "));
        data.push_str(&line(0.5, 1.5, "more #blue #red here"));
        data.push_str(&line(1.5, 0.5, "just #red today"));
        data.push_str(&line(9.0, 9.0, "far #away out"));
        data.push_str(r#"{"doc":{"coordinates":{"coordinates":[]},"text":"no geo #here ok"}},"#);
        data.push('\n');
        data.push_str("not a record\n");
        data.push_str("]\n");
        data.into_bytes()
    }

    fn scan(data: &[u8], workers: usize) -> Vec<PartialAggregate> {
        let grid = square_grid();
        let parser = RecordParser::default();
        plan(data.len() as u64, workers)
            .unwrap()
            .into_iter()
            .enumerate()
            .map(|(worker, range)| {
                PartitionAggregator::new(worker, range, &grid, &parser)
                    .run(&mut Cursor::new(data))
                    .unwrap()
            })
            .collect()
    }

    fn total(partials: &[PartialAggregate], id: &str) -> CellStats {
        let mut sum = CellStats::default();
        for partial in partials {
            sum.aggregate(&partial.cells[id]);
        }
        sum
    }

    #[test]
    fn test_single_worker_counts() {
        let partials = scan(&corpus(), 1);
        let partial = &partials[0];

        assert_eq!(partial.cells["A1"].post_count, 2);
        assert_eq!(partial.cells["A1"].hashtags.get("#blue"), Some(&2));
        assert_eq!(partial.cells["A1"].hashtags.get("#red"), Some(&1));
        assert_eq!(partial.cells["B2"].post_count, 1);
        assert_eq!(partial.cells["A2"].post_count, 0);
        assert_eq!(
            partial.stats,
            ScanStats {
                lines: 8,
                rejected: 3,
                unclassified: 2,
                matched: 3,
            }
        );
    }

    #[test]
    fn test_every_split_counts_each_record_once() {
        let data = corpus();
        let expected = scan(&data, 1);
        for workers in 2..=data.len() {
            let partials = scan(&data, workers);
            for id in ["A1", "A2", "B1", "B2"] {
                assert_eq!(
                    total(&partials, id),
                    expected[0].cells[id],
                    "cell {} with {} workers",
                    id,
                    workers
                );
            }
        }
    }

    #[test]
    fn test_truncated_final_record_is_ignored() {
        let mut data = line(0.5, 1.5, "kept #one here");
        let cut = line(0.5, 1.5, "lost #two here");
        data.push_str(&cut[..cut.len() - 6]);

        let partials = scan(data.as_bytes(), 1);
        assert_eq!(partials[0].cells["A1"].post_count, 1);
        assert_eq!(partials[0].cells["A1"].hashtags.get("#two"), None);
        assert_eq!(partials[0].stats.rejected, 1);
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let mut data = vec![0xff, 0xfe, b'\n'];
        data.extend_from_slice(line(1.5, 1.5, "ok").as_bytes());

        let partials = scan(&data, 1);
        assert_eq!(partials[0].cells["A2"].post_count, 1);
        assert_eq!(partials[0].stats.rejected, 1);
    }

    #[test]
    fn test_empty_range_reads_nothing() {
        let data = corpus();
        let grid = square_grid();
        let parser = RecordParser::default();
        let partial = PartitionAggregator::new(3, ByteRange::new(5, 5), &grid, &parser)
            .run(&mut Cursor::new(&data))
            .unwrap();

        assert_eq!(partial.worker, 3);
        assert_eq!(partial.stats, ScanStats::default());
    }

    #[test]
    fn test_source_size_keeps_position() {
        let mut source = Cursor::new(b"abc\ndef\n".to_vec());
        source.seek_to(4).unwrap();
        assert_eq!(source.size().unwrap(), 8);

        let mut buf = Vec::new();
        assert_eq!(source.next_line(&mut buf).unwrap(), 4);
        assert_eq!(buf, b"def\n");
    }
}
