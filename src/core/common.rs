use std::fmt::Display;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::str::FromStr;

use anyhow::{Result, bail};
use clap::ValueEnum;
use serde_derive::{Deserialize, Serialize};

use crate::core::konst::{
    CONSUMERS_AUTO, CURRENT_DIR, LOGFILE_NAME, LOGGING_JSON, LOGGING_QUIET, MIN_CONSUMERS, QUEUE_CAPACITY,
};

/// Address family a resolved hostname is reduced to.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IpProtocol {
    #[default]
    All,
    V4,
    V6,
}

impl Display for IpProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpProtocol::All => write!(f, "all"),
            IpProtocol::V4 => write!(f, "v4"),
            IpProtocol::V6 => write!(f, "v6"),
        }
    }
}

/// Name resolution backend.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Operating system resolver (getaddrinfo).
    #[default]
    System,
    /// Hickory async stub resolver.
    Hickory,
}

impl Display for ResolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverKind::System => write!(f, "system"),
            ResolverKind::Hickory => write!(f, "hickory"),
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SummaryFormat {
    #[default]
    Table,
    Json,
}

impl Display for SummaryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryFormat::Table => write!(f, "table"),
            SummaryFormat::Json => write!(f, "json"),
        }
    }
}

/// Size of the consumer pool.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WorkerCount {
    /// One consumer per available CPU.
    #[default]
    Auto,
    Explicit(usize),
}

impl WorkerCount {
    /// Resolve to a concrete pool size. Explicit counts below the minimum are rejected.
    pub fn get(&self) -> Result<usize> {
        match self {
            WorkerCount::Auto => Ok(std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(MIN_CONSUMERS)),
            WorkerCount::Explicit(n) if *n < MIN_CONSUMERS => {
                bail!("consumer count must be at least {MIN_CONSUMERS}, got {n}")
            }
            WorkerCount::Explicit(n) => Ok(*n),
        }
    }
}

impl FromStr for WorkerCount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(CONSUMERS_AUTO) {
            return Ok(WorkerCount::Auto);
        }
        match s.parse::<usize>() {
            Ok(n) if n >= MIN_CONSUMERS => Ok(WorkerCount::Explicit(n)),
            Ok(n) => bail!("consumer count must be at least {MIN_CONSUMERS}, got {n}"),
            Err(_) => bail!("consumer count: `{s}` is invalid, expected `{CONSUMERS_AUTO}` or a number"),
        }
    }
}

impl Display for WorkerCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerCount::Auto => write!(f, "{CONSUMERS_AUTO}"),
            WorkerCount::Explicit(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PipelineOptions {
    pub queue_capacity: usize,
    /// `auto` or a number.
    pub consumers: String,
    pub resolver: ResolverKind,
    pub ip_protocol: IpProtocol,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            queue_capacity: QUEUE_CAPACITY,
            consumers: CONSUMERS_AUTO.to_owned(),
            resolver: ResolverKind::default(),
            ip_protocol: IpProtocol::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingOptions {
    pub dir: String,
    pub file: String,
    pub json: bool,
    pub quiet: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            dir: CURRENT_DIR.to_owned(),
            file: LOGFILE_NAME.to_owned(),
            json: LOGGING_JSON,
            quiet: LOGGING_QUIET,
        }
    }
}

/// One output line: a hostname and the address it resolved to, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultRecord {
    pub hostname: String,
    pub address: Option<IpAddr>,
}

impl Display for ResultRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.address {
            Some(addr) => write!(f, "{},{}", self.hostname, addr),
            None => write!(f, "{},", self.hostname),
        }
    }
}

/// What a producer contributed from its source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub hostnames: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerReport {
    pub resolved: usize,
    pub failed: usize,
    pub write_errors: usize,
}

impl ConsumerReport {
    pub fn merge(&mut self, other: ConsumerReport) {
        self.resolved += other.resolved;
        self.failed += other.failed;
        self.write_errors += other.write_errors;
    }

    pub fn processed(&self) -> usize {
        self.resolved + self.failed
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_utc: String,
    pub elapsed_ms: f64,
    pub consumers: usize,
    pub queue_capacity: usize,
    pub sources: Vec<SourceReport>,
    pub resolved: usize,
    pub failed: usize,
    pub written: usize,
    pub write_errors: usize,
}
