use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{Level, event};

use crate::core::common::{ConsumerReport, ResultRecord};
use crate::dns::resolver::Resolve;
use crate::pipeline::liveness::LivenessCounter;
use crate::pipeline::queue::BoundedQueue;
use crate::pipeline::sink::OutputSink;

/// Pops hostnames, resolves them and appends one record per hostname.
pub struct Consumer<R, W> {
    pub id: usize,
    pub queue: Arc<BoundedQueue<String>>,
    pub liveness: Arc<LivenessCounter>,
    pub sink: Arc<OutputSink<W>>,
    pub resolver: Arc<R>,
}

impl<R, W> Consumer<R, W>
where
    R: Resolve,
    W: AsyncWrite + Unpin + Send,
{
    pub async fn run(self) -> ConsumerReport {
        let mut report = ConsumerReport::default();

        loop {
            if self.queue.is_drained(&self.liveness).await {
                break;
            }

            // A live producer either pushes again or retires, and the last
            // retirement completes `wait_zero`, so this wait always ends.
            let hostname = match self.queue.pop_unless(self.liveness.wait_zero()).await {
                Ok(Some(hostname)) => hostname,
                Ok(None) => break,
                Err(e) => {
                    event!(Level::ERROR, consumer = self.id, "{e:#}");
                    break;
                }
            };

            let address = match self.resolver.resolve(&hostname).await {
                Ok(addr) => {
                    report.resolved += 1;
                    Some(addr)
                }
                Err(e) => {
                    event!(Level::WARN, consumer = self.id, "{e:#}");
                    report.failed += 1;
                    None
                }
            };

            let record = ResultRecord { hostname, address };
            if let Err(e) = self.sink.append(&record).await {
                event!(Level::ERROR, consumer = self.id, "error writing `{record}`: {e:#}");
                report.write_errors += 1;
            }
        }

        event!(
            Level::DEBUG,
            consumer = self.id,
            resolved = report.resolved,
            failed = report.failed,
            "consumer finished"
        );
        report
    }
}
