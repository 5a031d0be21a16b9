use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use crate::core::common::ResultRecord;
use crate::core::konst::SINK_BUFFER_SIZE;

/// Single destination shared by every consumer. Each record is written as
/// one whole line while the lock is held.
#[derive(Debug)]
pub struct OutputSink<W> {
    writer: Mutex<SinkState<W>>,
}

#[derive(Debug)]
struct SinkState<W> {
    writer: BufWriter<W>,
    written: usize,
}

impl OutputSink<File> {
    /// Create (or truncate) the output file.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .await
            .with_context(|| format!("error opening output file `{}`", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W> OutputSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self::with_capacity(SINK_BUFFER_SIZE, writer)
    }

    /// A capacity of 0 hands every record straight to `writer`.
    pub fn with_capacity(capacity: usize, writer: W) -> Self {
        Self {
            writer: Mutex::new(SinkState {
                writer: BufWriter::with_capacity(capacity, writer),
                written: 0,
            }),
        }
    }

    pub async fn append(&self, record: &ResultRecord) -> Result<()> {
        let line = format!("{record}\n");
        let mut state = self.writer.lock().await;
        state.writer.write_all(line.as_bytes()).await?;
        state.written += 1;
        Ok(())
    }

    /// Flush and shut the writer down. Returns the records written and the
    /// underlying writer.
    pub async fn finish(self) -> Result<(usize, W)> {
        let SinkState { mut writer, written } = self.writer.into_inner();
        writer.flush().await.context("flushing output")?;
        writer.shutdown().await.context("closing output")?;
        Ok((written, writer.into_inner()))
    }
}


/// Writer whose every write fails with `BrokenPipe`.
#[cfg(test)]
pub struct BrokenWriter;

#[cfg(test)]
impl AsyncWrite for BrokenWriter {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
        _: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(self: std::pin::Pin<&mut Self>, _: &mut std::task::Context<'_>) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }
}
