use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;
use tracing::{Level, debug, event};

use crate::core::common::SourceReport;
use crate::core::konst::MAX_NAME_LENGTH;
use crate::pipeline::liveness::LivenessCounter;
use crate::pipeline::queue::BoundedQueue;
use crate::util::parser::{hostname_tokens, valid_hostname_len};

/// Reads one input file and feeds its hostnames into the queue.
pub struct Producer {
    pub source: PathBuf,
    pub queue: Arc<BoundedQueue<String>>,
    pub liveness: Arc<LivenessCounter>,
}

impl Producer {
    /// Read the whole source, then retire from the liveness counter.
    /// The counter is decremented whether or not the source could be read.
    pub async fn run(self) -> SourceReport {
        let mut report = SourceReport {
            source: self.source.display().to_string(),
            ..Default::default()
        };

        if let Err(e) = self.read_source(&mut report).await {
            event!(Level::WARN, source = %report.source, "{e:#}");
            report.error = Some(format!("{e:#}"));
        }

        match self.liveness.decrement().await {
            Ok(remaining) => debug!(source = %report.source, remaining, "producer finished"),
            Err(e) => event!(Level::ERROR, source = %report.source, "{e}"),
        }
        report
    }

    async fn read_source(&self, report: &mut SourceReport) -> Result<()> {
        let file = File::open(&self.source)
            .await
            .with_context(|| format!("Error Opening Input File: {}", self.source.display()))?;
        push_hostnames(BufReader::new(file), &self.queue, report)
            .await
            .with_context(|| format!("Error Reading Input File: {}", self.source.display()))
    }
}

/// Push every hostname token from `reader`, suspending while the queue is full.
/// Lines are read as raw bytes; invalid UTF-8 is replaced, not fatal.
pub async fn push_hostnames<R>(reader: R, queue: &BoundedQueue<String>, report: &mut SourceReport) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = SplitStream::new(reader.split(b'\n'));
    while let Some(line) = lines.next().await {
        let line = line?;
        let line = String::from_utf8_lossy(&line);
        if let Cow::Owned(_) = line {
            event!(Level::WARN, source = %report.source, "line is not valid UTF-8, invalid bytes replaced");
        }
        for token in hostname_tokens(&line) {
            if !valid_hostname_len(token) {
                event!(
                    Level::WARN,
                    source = %report.source,
                    "hostname longer than {MAX_NAME_LENGTH} bytes skipped"
                );
                report.skipped += 1;
                continue;
            }
            queue.push(token.to_owned()).await?;
            report.hostnames += 1;
        }
    }
    Ok(())
}
