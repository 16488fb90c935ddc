//! Raw sample sources
//!
//! A source yields one raw ADC sample per pull and `None` once exhausted.
//! Two implementations are provided:
//!
//! 1. **FileSource**: a line-oriented text feed, one integer per line,
//!    standing in for the hardware sensor
//! 2. **VecSource**: an in-memory token list for tests and demos
//!
//! ## File Format
//!
//! ```text
//! 2048
//!   2051
//!
//! 4095
//! ```
//!
//! Tokens are whitespace-trimmed and blank lines are skipped. Anything
//! else that is not an integer in `[0, 4095]` surfaces as
//! [`SourceError::Sample`] carrying the 1-based line number.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thermolink_core::{calibration::parse_raw_sample, RawSample};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::errors::SourceError;

/// Pull interface over raw samples
#[async_trait]
pub trait RawSource: Send {
    /// Next raw sample, or `None` once the source is exhausted
    ///
    /// Implementations must be cancel safe: the sampler drops this future
    /// when shutdown is requested.
    async fn next_sample(&mut self) -> Option<Result<RawSample, SourceError>>;
}

/// Line-oriented file source
pub struct FileSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: u64,
}

impl FileSource {
    /// Open `path`; failure here is fatal for the agent
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await.map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;

        log::info!("Reading raw samples from {}", path.display());
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }

    /// Path the source reads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines consumed so far, blank ones included
    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}

#[async_trait]
impl RawSource for FileSource {
    async fn next_sample(&mut self) -> Option<Result<RawSample, SourceError>> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(SourceError::Read(e))),
            };
            self.line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(parse_raw_sample(&line).map_err(|source| SourceError::Sample {
                line: self.line_number,
                source,
            }));
        }
    }
}

/// In-memory source over a fixed list of tokens
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    tokens: VecDeque<String>,
    consumed: u64,
}

impl VecSource {
    /// Source yielding `tokens` in order, parsed like file lines
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            consumed: 0,
        }
    }

    /// Source yielding already numeric raw values
    pub fn from_raw(values: impl IntoIterator<Item = u16>) -> Self {
        Self::from_tokens(values.into_iter().map(|v| v.to_string()))
    }

    /// Tokens not yet pulled
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl RawSource for VecSource {
    async fn next_sample(&mut self) -> Option<Result<RawSample, SourceError>> {
        let token = self.tokens.pop_front()?;
        self.consumed += 1;
        Some(parse_raw_sample(&token).map_err(|source| SourceError::Sample {
            line: self.consumed,
            source,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use thermolink_core::SampleError;

    #[tokio::test]
    async fn vec_source_yields_in_order() {
        let mut source = VecSource::from_raw([0, 4095, 2048]);
        assert_eq!(source.remaining(), 3);

        let values: Vec<u16> = [
            source.next_sample().await,
            source.next_sample().await,
            source.next_sample().await,
        ]
        .into_iter()
        .map(|s| s.unwrap().unwrap().value())
        .collect();

        assert_eq!(values, vec![0, 4095, 2048]);
        assert!(source.next_sample().await.is_none());
    }

    #[tokio::test]
    async fn vec_source_reports_malformed() {
        let mut source = VecSource::from_tokens(["12", "oops"]);
        assert!(source.next_sample().await.unwrap().is_ok());

        match source.next_sample().await {
            Some(Err(SourceError::Sample { line, source })) => {
                assert_eq!(line, 2);
                assert_eq!(source, SampleError::Malformed { token: "oops".into() });
            }
            other => panic!("expected malformed sample, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn file_source_trims_and_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, " 12 \n\n4095\r\nabc\n5000").unwrap();

        let mut source = FileSource::open(file.path()).await.unwrap();
        assert_eq!(source.path(), file.path());

        assert_eq!(source.next_sample().await.unwrap().unwrap().value(), 12);
        assert_eq!(source.next_sample().await.unwrap().unwrap().value(), 4095);

        match source.next_sample().await {
            Some(Err(SourceError::Sample { line: 4, .. })) => {}
            other => panic!("expected malformed line 4, got {:?}", other),
        }
        match source.next_sample().await {
            Some(Err(SourceError::Sample {
                line: 5,
                source: SampleError::OutOfRange { value: 5000 },
            })) => {}
            other => panic!("expected out of range line 5, got {:?}", other),
        }

        assert!(source.next_sample().await.is_none());
        assert_eq!(source.line_number(), 5);
    }

    #[tokio::test]
    async fn file_source_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSource::open(dir.path().join("temperature.txt")).await;
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }
}
