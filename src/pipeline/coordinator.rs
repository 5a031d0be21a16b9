use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow, bail};
use futures::future::join_all;
use tokio::io::AsyncWrite;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

use crate::core::common::{ConsumerReport, RunSummary, SourceReport};
use crate::core::konst::MIN_CONSUMERS;
use crate::dns::resolver::Resolve;
use crate::pipeline::consumer::Consumer;
use crate::pipeline::liveness::LivenessCounter;
use crate::pipeline::producer::Producer;
use crate::pipeline::queue::BoundedQueue;
use crate::pipeline::sink::OutputSink;
use crate::util::time::{elapsed_ms, time_now_utc};

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// One producer per source.
    pub sources: Vec<PathBuf>,
    pub consumers: usize,
    pub queue_capacity: usize,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.consumers < MIN_CONSUMERS {
            bail!("consumer count must be at least {MIN_CONSUMERS}, got {}", self.consumers);
        }
        if self.queue_capacity == 0 {
            bail!("queue capacity must be at least 1");
        }
        Ok(())
    }
}

/// Run producers and consumers to completion.
///
/// Producers and consumers run concurrently. Producers are joined first,
/// then consumers, and only then is the sink flushed and closed. The
/// finished writer is handed back with the summary.
pub async fn run_pipeline<R, W>(
    config: &PipelineConfig,
    resolver: Arc<R>,
    sink: OutputSink<W>,
) -> Result<(RunSummary, W)>
where
    R: Resolve,
    W: AsyncWrite + Unpin + Send + 'static,
{
    config.validate()?;

    let run_id = Uuid::new_v4().to_string();
    let span = info_span!("pipeline", run_id = %run_id);
    let started_utc = time_now_utc();
    let start = Instant::now();

    let queue = Arc::new(BoundedQueue::new(config.queue_capacity)?);
    let liveness = Arc::new(LivenessCounter::new(config.sources.len()));
    let sink = Arc::new(sink);

    event!(
        parent: &span,
        Level::INFO,
        producers = config.sources.len(),
        consumers = config.consumers,
        queue_capacity = config.queue_capacity,
        "pipeline starting"
    );

    let producers: Vec<_> = config
        .sources
        .iter()
        .map(|source| {
            let producer = Producer {
                source: source.to_owned(),
                queue: queue.clone(),
                liveness: liveness.clone(),
            };
            tokio::spawn(producer.run().instrument(span.clone()))
        })
        .collect();

    let consumers: Vec<_> = (0..config.consumers)
        .map(|id| {
            let consumer = Consumer {
                id,
                queue: queue.clone(),
                liveness: liveness.clone(),
                sink: sink.clone(),
                resolver: resolver.clone(),
            };
            tokio::spawn(consumer.run().instrument(span.clone()))
        })
        .collect();

    let mut sources = Vec::with_capacity(producers.len());
    for (handle, source) in producers.into_iter().zip(&config.sources) {
        match handle.await {
            Ok(report) => sources.push(report),
            Err(e) => {
                // The task never reached its own decrement.
                event!(parent: &span, Level::ERROR, source = %source.display(), "producer failed: {e}");
                liveness.decrement().await?;
                sources.push(SourceReport {
                    source: source.display().to_string(),
                    error: Some(format!("producer failed: {e}")),
                    ..Default::default()
                });
            }
        }
    }

    if !liveness.is_zero().await {
        bail!("{} producer(s) still counted live after joining", liveness.read().await);
    }

    let mut totals = ConsumerReport::default();
    for result in join_all(consumers).await {
        match result {
            Ok(report) => totals.merge(report),
            Err(e) => event!(parent: &span, Level::ERROR, "consumer failed: {e}"),
        }
    }

    if !queue.is_empty().await {
        event!(parent: &span, Level::ERROR, "hostnames left unresolved in the queue");
    }
    drop(queue);
    drop(liveness);

    let sink = Arc::into_inner(sink).ok_or_else(|| anyhow!("output sink still in use after consumers finished"))?;
    let (written, writer) = sink.finish().await?;

    let summary = RunSummary {
        run_id,
        started_utc,
        elapsed_ms: elapsed_ms(start),
        consumers: config.consumers,
        queue_capacity: config.queue_capacity,
        sources,
        resolved: totals.resolved,
        failed: totals.failed,
        written,
        write_errors: totals.write_errors,
    };
    event!(
        parent: &span,
        Level::INFO,
        processed = totals.processed(),
        resolved = summary.resolved,
        failed = summary.failed,
        written = summary.written,
        "pipeline finished"
    );
    Ok((summary, writer))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use tempfile::{NamedTempFile, tempdir};
    use tokio::time::timeout;

    use super::*;
    use crate::dns::stub::StubResolver;

    fn source(names: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for name in names {
            writeln!(file, "{name}").unwrap();
        }
        file
    }

    async fn run(
        sources: &[&NamedTempFile],
        consumers: usize,
        queue_capacity: usize,
        resolver: StubResolver,
    ) -> (RunSummary, Vec<String>) {
        let config = PipelineConfig {
            sources: sources.iter().map(|f| f.path().to_path_buf()).collect(),
            consumers,
            queue_capacity,
        };
        let run = run_pipeline(&config, Arc::new(resolver), OutputSink::new(Vec::new()));
        let (summary, bytes) = timeout(Duration::from_secs(10), run).await.unwrap().unwrap();
        let mut lines: Vec<String> = String::from_utf8(bytes).unwrap().lines().map(str::to_owned).collect();
        lines.sort_unstable();
        (summary, lines)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_sources_two_consumers() {
        let first = source(&["a.com", "b.com"]);
        let second = source(&["c.com"]);
        let resolver = StubResolver::new([("a.com", "1.1.1.1"), ("c.com", "2.2.2.2")]);

        let (summary, lines) = run(&[&first, &second], 2, 2, resolver).await;

        assert_eq!(lines, vec!["a.com,1.1.1.1", "b.com,", "c.com,2.2.2.2"]);
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.written, 3);
        assert_eq!(summary.sources.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn capacity_one_is_complete() {
        let names: Vec<String> = (0..50).map(|i| format!("host{i}.test")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let files: Vec<NamedTempFile> = names.chunks(10).map(source).collect();
        let files: Vec<&NamedTempFile> = files.iter().collect();

        let (summary, lines) = run(&files, 3, 1, StubResolver::default()).await;

        assert_eq!(summary.written, 50);
        assert_eq!(summary.failed, 50);
        let mut expected: Vec<String> = names.iter().map(|n| format!("{n},")).collect();
        expected.sort_unstable();
        assert_eq!(lines, expected);
    }

    #[tokio::test]
    async fn zero_sources_finishes_without_output() {
        let resolver = Arc::new(StubResolver::default());
        let config = PipelineConfig {
            sources: vec![],
            consumers: 4,
            queue_capacity: 2,
        };
        let (summary, bytes) = run_pipeline(&config, resolver.clone(), OutputSink::new(Vec::new()))
            .await
            .unwrap();
        assert_eq!(summary.written, 0);
        assert!(bytes.is_empty());
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn duplicates_are_resolved_independently() {
        let file = source(&["a.com", "a.com", "a.com"]);
        let resolver = StubResolver::new([("a.com", "1.1.1.1")]);

        let (summary, lines) = run(&[&file], 2, 2, resolver).await;

        assert_eq!(summary.resolved, 3);
        assert_eq!(lines, vec!["a.com,1.1.1.1"; 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unreadable_source_does_not_stall_others() {
        let good = source(&["a.com", "b.com"]);
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            sources: vec![dir.path().join("missing.txt"), good.path().to_path_buf()],
            consumers: 2,
            queue_capacity: 1,
        };
        let resolver = Arc::new(StubResolver::new([("a.com", "1.1.1.1"), ("b.com", "::1")]));

        let run = run_pipeline(&config, resolver, OutputSink::new(Vec::new()));
        let (summary, bytes) = timeout(Duration::from_secs(10), run).await.unwrap().unwrap();

        assert_eq!(summary.written, 2);
        assert!(summary.sources[0].error.is_some());
        assert_eq!(summary.sources[1].hostnames, 2);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("a.com,1.1.1.1\n"));
        assert!(text.contains("b.com,::1\n"));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_start() {
        let resolver = Arc::new(StubResolver::default());
        let no_consumers = PipelineConfig {
            sources: vec![],
            consumers: 0,
            queue_capacity: 1,
        };
        assert!(
            run_pipeline(&no_consumers, resolver.clone(), OutputSink::new(Vec::new()))
                .await
                .is_err()
        );

        let no_capacity = PipelineConfig {
            sources: vec![],
            consumers: 1,
            queue_capacity: 0,
        };
        assert!(
            run_pipeline(&no_capacity, resolver, OutputSink::new(Vec::new()))
                .await
                .is_err()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_producers_many_consumers_complete() {
        let files: Vec<NamedTempFile> = (0..16)
            .map(|p| {
                let names: Vec<String> = (0..40).map(|i| format!("p{p}-h{i}.test")).collect();
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                source(&names)
            })
            .collect();
        let files: Vec<&NamedTempFile> = files.iter().collect();

        let (summary, lines) = run(&files, 5, 3, StubResolver::default()).await;

        assert_eq!(summary.written, 640);
        assert_eq!(lines.len(), 640);
        lines.windows(2).for_each(|w| assert_ne!(w[0], w[1]));
    }
}
