//! Sensor line source port.
//!
//! The physical transport is outside the engine. A source yields already
//! decoded text lines and may fail mid-stream; the ingestion loop treats both a
//! failure and the end of the stream as a disconnect.

use std::future::Future;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

pub trait LineSource: Send + 'static {
    /// Next line without its terminator. `Ok(None)` marks the end of the stream.
    fn next_line(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Line source over any buffered tokio reader (stdin, a device file, a socket).
pub struct BufLineSource<R> {
    lines: Lines<R>,
}

impl<R> BufLineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R> LineSource for BufLineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_line(&mut self) -> Result<Option<String>> {
        self.lines
            .next_line()
            .await
            .context("failed to read sensor line")
    }
}
