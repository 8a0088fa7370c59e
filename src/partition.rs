use std::fmt;

use crate::error::{HistogramError, Result};

/// A worker's slice of the input file, in byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        ByteRange { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Splits `file_size` bytes into `workers` contiguous ranges.
///
/// Every range has the same nominal length `file_size / workers`; the last one
/// is stretched to `file_size` so the integer-division remainder is not lost.
pub fn plan(file_size: u64, workers: usize) -> Result<Vec<ByteRange>> {
    if workers == 0 {
        return Err(HistogramError::InvalidConfig(
            "worker count must be at least 1".to_string(),
        ));
    }

    let workers = workers as u64;
    let chunk = file_size / workers;
    let ranges = (0..workers)
        .map(|i| {
            let end = if i + 1 == workers {
                file_size
            } else {
                (i + 1) * chunk
            };
            ByteRange::new(i * chunk, end)
        })
        .collect();

    Ok(ranges)
}
