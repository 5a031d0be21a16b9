use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};

use crate::dns::resolver::Resolve;

/// Resolver backed by a fixed table. Unknown names fail.
#[derive(Debug, Default)]
pub struct StubResolver {
    table: HashMap<String, IpAddr>,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let table = entries
            .into_iter()
            .map(|(host, addr)| (host.to_owned(), addr.parse().expect("stub address")))
            .collect();
        Self {
            table,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Resolve for StubResolver {
    async fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.table
            .get(hostname)
            .copied()
            .ok_or_else(|| anyhow!("dnslookup error: {hostname}"))
    }
}
