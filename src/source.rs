use crate::record::{DEFAULT_ERROR_KEY, DEFAULT_MESSAGE_KEY};
use async_trait::async_trait;
use serde_json::Value;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader, Stdin};
use tracing::{debug, warn};

/// A stream of structured records consumed by the router.
///
/// Besides the records, a source carries the names of the message and
/// error fields used by its producer.
#[async_trait]
pub trait RecordSource: Send {
    /// Pull the next record.
    ///
    /// **Returns**
    /// - `Ok(Some(value))` for the next record. A JSON `null` is passed
    ///   through; the router treats it as the end of the stream.
    /// - `Ok(None)` once the stream is exhausted.
    /// - `Err(..)` if the underlying stream failed.
    async fn next_record(&mut self) -> io::Result<Option<Value>>;

    fn message_key(&self) -> &str {
        DEFAULT_MESSAGE_KEY
    }

    fn error_key(&self) -> &str {
        DEFAULT_ERROR_KEY
    }
}

/// Longest line a [`LineSource`] buffers by default, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Newline-delimited JSON source, as written by pino to a file descriptor.
///
/// Blank lines are ignored and lines that are not valid JSON are skipped
/// with a warning. Lines longer than the configured maximum are skipped too,
/// without buffering more than the maximum. With
/// [`LineSource::expect_pino_config`] enabled, a leading
/// `{"pinoConfig": {..}}` line configures the message and error keys and is
/// not yielded as a record.
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
    message_key: String,
    error_key: String,
    expect_pino_config: bool,
    started: bool,
    max_line_length: usize,
    skipped_lines: u64,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        LineSource {
            reader,
            buf: Vec::new(),
            message_key: DEFAULT_MESSAGE_KEY.to_owned(),
            error_key: DEFAULT_ERROR_KEY.to_owned(),
            expect_pino_config: false,
            started: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            skipped_lines: 0,
        }
    }

    pub fn with_message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = key.into();
        self
    }

    pub fn with_error_key(mut self, key: impl Into<String>) -> Self {
        self.error_key = key.into();
        self
    }

    pub fn expect_pino_config(mut self, expect: bool) -> Self {
        self.expect_pino_config = expect;
        self
    }

    /// Lines longer than `max` bytes, newline excluded, are skipped.
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Number of lines dropped because they were not valid JSON or too long.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }

    /// Drop input up to and including the next newline.
    async fn discard_line(&mut self) -> io::Result<()> {
        loop {
            let (consumed, done) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(());
                }
                match available.iter().position(|b| *b == b'\n') {
                    Some(pos) => (pos + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(consumed);
            if done {
                return Ok(());
            }
        }
    }

    fn apply_pino_config(&mut self, config: &Value) {
        if let Some(key) = config.get("messageKey").and_then(Value::as_str) {
            self.message_key = key.to_owned();
        }
        if let Some(key) = config.get("errorKey").and_then(Value::as_str) {
            self.error_key = key.to_owned();
        }
        debug!(
            message_key = %self.message_key,
            error_key = %self.error_key,
            "applied pino config from stream"
        );
    }
}

impl LineSource<BufReader<Stdin>> {
    /// Read records from the process's standard input.
    pub fn stdin() -> Self {
        LineSource::new(BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> RecordSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_record(&mut self) -> io::Result<Option<Value>> {
        loop {
            self.buf.clear();
            let limit = self.max_line_length as u64 + 1;
            if (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.buf)
                .await?
                == 0
            {
                return Ok(None);
            }

            if self.buf.len() > self.max_line_length && self.buf.last() != Some(&b'\n') {
                self.discard_line().await?;
                self.skipped_lines += 1;
                warn!(
                    max_line_length = self.max_line_length,
                    "skipping line longer than the maximum"
                );
                continue;
            }

            let line = self.buf.trim_ascii();
            if line.is_empty() {
                continue;
            }

            let value: Value = match serde_json::from_slice(line) {
                Ok(value) => value,
                Err(e) => {
                    self.skipped_lines += 1;
                    warn!(error = %e, "skipping line that is not valid JSON");
                    continue;
                }
            };

            if self.expect_pino_config && !self.started {
                self.started = true;
                if let Some(config) = value.get("pinoConfig") {
                    self.apply_pino_config(config);
                    continue;
                }
            }

            self.started = true;
            return Ok(Some(value));
        }
    }

    fn message_key(&self) -> &str {
        &self.message_key
    }

    fn error_key(&self) -> &str {
        &self.error_key
    }
}
