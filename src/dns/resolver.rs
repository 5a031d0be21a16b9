use std::future::Future;
use std::net::{IpAddr, ToSocketAddrs};

use anyhow::{Context, Result, anyhow};
use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use tracing::debug;

use crate::core::common::{IpProtocol, ResolverKind};

/// Hostname to address lookup used by the consumer pool.
///
/// Implementations may block or be slow; they must not touch pipeline state.
pub trait Resolve: Send + Sync + 'static {
    fn resolve(&self, hostname: &str) -> impl Future<Output = Result<IpAddr>> + Send;
}

/// Pick the first address of the wanted family.
pub fn first_address(addrs: impl IntoIterator<Item = IpAddr>, ip_protocol: IpProtocol) -> Option<IpAddr> {
    addrs.into_iter().find(|addr| match ip_protocol {
        IpProtocol::All => true,
        IpProtocol::V4 => addr.is_ipv4(),
        IpProtocol::V6 => addr.is_ipv6(),
    })
}

/// Operating system resolver. `getaddrinfo` blocks, so every lookup runs on
/// the blocking pool.
#[derive(Clone, Debug, Default)]
pub struct SystemResolver {
    pub ip_protocol: IpProtocol,
}

impl Resolve for SystemResolver {
    async fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        let host = hostname.to_owned();
        let ip_protocol = self.ip_protocol;

        let addrs = tokio::task::spawn_blocking(move || {
            (host.as_str(), 0u16)
                .to_socket_addrs()
                .map(|iter| iter.map(|socket| socket.ip()).collect::<Vec<_>>())
        })
        .await
        .context("lookup task failed")?
        .with_context(|| format!("dnslookup error: {hostname}"))?;

        debug!(hostname, count = addrs.len(), "getaddrinfo complete");
        first_address(addrs, ip_protocol).ok_or_else(|| anyhow!("dnslookup error: {hostname} has no {ip_protocol} address"))
    }
}

/// Async stub resolver using the system's nameserver configuration, falling
/// back to hickory's defaults when that cannot be read.
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
    pub ip_protocol: IpProtocol,
}

impl HickoryResolver {
    pub fn new(ip_protocol: IpProtocol) -> Self {
        let resolver = match TokioResolver::builder_tokio() {
            Ok(builder) => builder.build(),
            Err(e) => {
                debug!("system resolver config unavailable ({e}), using defaults");
                TokioResolver::builder_with_config(ResolverConfig::default(), TokioConnectionProvider::default())
                    .build()
            }
        };
        Self { resolver, ip_protocol }
    }
}

impl Resolve for HickoryResolver {
    async fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        let lookup = self
            .resolver
            .lookup_ip(hostname)
            .await
            .with_context(|| format!("dnslookup error: {hostname}"))?;
        first_address(lookup.iter(), self.ip_protocol)
            .ok_or_else(|| anyhow!("dnslookup error: {hostname} has no {} address", self.ip_protocol))
    }
}

/// Resolver selected at runtime from configuration.
#[derive(Clone)]
pub enum Resolver {
    System(SystemResolver),
    Hickory(HickoryResolver),
}

impl Resolver {
    pub fn new(kind: ResolverKind, ip_protocol: IpProtocol) -> Self {
        match kind {
            ResolverKind::System => Resolver::System(SystemResolver { ip_protocol }),
            ResolverKind::Hickory => Resolver::Hickory(HickoryResolver::new(ip_protocol)),
        }
    }
}

impl Resolve for Resolver {
    async fn resolve(&self, hostname: &str) -> Result<IpAddr> {
        match self {
            Resolver::System(r) => r.resolve(hostname).await,
            Resolver::Hickory(r) => r.resolve(hostname).await,
        }
    }
}
