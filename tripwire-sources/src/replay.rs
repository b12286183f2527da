//! Replay of recorded values
//!
//! A recording is plain text with one sample per line. Blank lines and lines
//! starting with `#` are skipped. For comma-separated recordings, pick the
//! value column with [`ReplaySource::parse_column`]:
//!
//! ```text
//! # timestamp,temperature
//! 0,21.5
//! 1000,21.7
//! ```
//!
//! Each read returns the next value. At the end of the recording the source
//! either wraps around or reports `WouldBlock`, in which case the sensor
//! keeps showing the last value.

use std::path::Path;

use log::debug;
use tripwire_core::errors::SourceError;
use tripwire_core::{SampleSource, Timestamp};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySource {
    values: Vec<f64>,
    pos: usize,
    looped: bool,
}

impl ReplaySource {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            pos: 0,
            looped: false,
        }
    }

    /// Wrap to the first value after the last one
    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    /// Parse a single-column recording
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_column(text, 0)
    }

    /// Parse column `column` (zero-based) of a comma-separated recording
    pub fn parse_column(text: &str, column: usize) -> Result<Self> {
        let mut values = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let field = line.split(',').nth(column).map(str::trim);
            match field.and_then(|f| f.parse::<f64>().ok()) {
                Some(v) if v.is_finite() => values.push(v),
                _ => {
                    return Err(ConfigError::Parse {
                        line: idx + 1,
                        content: line.to_string(),
                    })
                }
            }
        }
        Ok(Self::new(values))
    }

    /// Load a recording from disk
    pub fn from_path(path: impl AsRef<Path>, column: usize) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let replay = Self::parse_column(&text, column)?;
        debug!("loaded {} samples from {:?}", replay.len(), path);
        Ok(replay)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values not yet replayed in the current pass
    pub fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.pos)
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl SampleSource for ReplaySource {
    fn read(&mut self, _now: Timestamp) -> nb::Result<f64, SourceError> {
        if self.pos >= self.values.len() {
            if !self.looped || self.values.is_empty() {
                return Err(nb::Error::WouldBlock);
            }
            self.pos = 0;
        }
        let value = self.values[self.pos];
        self.pos += 1;
        Ok(value)
    }

    fn kind(&self) -> &'static str {
        "replay"
    }
}
