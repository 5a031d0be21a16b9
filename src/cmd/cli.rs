use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, event};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::core::common::{
    IpProtocol, LoggingOptions, PipelineOptions, ResolverKind, SummaryFormat, WorkerCount,
};
use crate::core::config::Config;
use crate::core::konst::{
    APP_NAME, CLI_HEADER_MSG, CONFIG_FILE, CURRENT_DIR, LOG_ENV_VAR, LOGFILE_NAME, LOGGING_JSON,
    LOGGING_QUIET, QUEUE_CAPACITY,
};
use crate::dns::resolver::Resolver;
use crate::pipeline::coordinator::{PipelineConfig, run_pipeline};
use crate::pipeline::sink::OutputSink;
use crate::util::message::{pipeline_start_msg, summary_msg};

#[derive(Debug, Parser)]
#[command(name = APP_NAME)]
#[command(bin_name = APP_NAME)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MultiLookup - Resolve hostnames from many files concurrently", long_about = None)]
#[command(after_help = format_examples(&[
    "mlookup names1.txt names2.txt results.txt        # One resolver per CPU",
    "mlookup -t 4 -Q 32 names*.txt results.txt        # 4 resolvers, 32 slot queue",
    "mlookup -R hickory -I v4 names.txt results.txt   # Async resolver, IPv4 only",
]))]
pub struct Cli {
    /// Input files, one hostname per whitespace-separated token
    #[clap(required = true, num_args = 1.., display_order = 1)]
    inputs: Vec<PathBuf>,

    /// Output file, one `hostname,address` line per hostname
    #[clap(required = true, display_order = 2)]
    output: PathBuf,

    /// Resolver threads (`auto` == one per CPU)
    #[clap(short = 't', long, default_value_t = WorkerCount::Auto, display_order = 10)]
    threads: WorkerCount,

    /// Queue capacity
    #[clap(short = 'Q', long, default_value_t = QUEUE_CAPACITY, display_order = 11)]
    queue_capacity: usize,

    /// Name resolution backend
    #[clap(short = 'R', long, default_value_t = ResolverKind::default(), display_order = 12)]
    resolver: ResolverKind,

    /// Address family to report
    #[clap(short = 'I', long, default_value_t = IpProtocol::default(), display_order = 13)]
    ip_proto: IpProtocol,

    /// Run summary format
    #[clap(long, default_value_t = SummaryFormat::default(), display_order = 14)]
    summary: SummaryFormat,

    /// Config filename.
    /// Search Path: $CWD/mlookup.toml
    #[clap(short, long, default_value = CONFIG_FILE, display_order = 20)]
    config: String,

    // Logging options
    // --------------
    /// Logging directory
    #[clap(long, default_value = CURRENT_DIR, display_order = 30)]
    dir: String,

    /// Logging filename
    #[clap(long, default_value = LOGFILE_NAME, display_order = 31)]
    file: String,

    /// Log to file in JSON format
    #[clap(long, default_value_t = false, display_order = 32)]
    json: bool,

    /// Silence terminal output
    #[clap(long, default_value_t = false, display_order = 33)]
    quiet: bool,
}

impl Cli {
    pub fn init() -> Cli {
        Cli::parse()
    }

    pub async fn run(&self) -> Result<()> {
        let (config, config_msg) = match Path::new(&self.config).exists() {
            true => (
                Config::load(&self.config)?,
                format!("Using configuration file `{}`.", self.config),
            ),
            false => (
                Config::default(),
                format!("Configuration file `{}` not found. Using default configuration.", self.config),
            ),
        };
        let (pipeline_options, logging_options) = self.merge_options(config);

        if !logging_options.quiet {
            println!("{CLI_HEADER_MSG}");
            println!("{config_msg}\n");
        }

        let _guard = init_tracing(&logging_options);

        let result = self.execute(pipeline_options, &logging_options).await;
        if let Err(e) = &result {
            event!(target: APP_NAME, Level::ERROR, "{e:#}");
        }
        result
    }

    // CLI options should override config file options.
    // If a CLI option is NOT the same as the default,
    // the option was set from the CLI. Therefore we should
    // use the CLI option. Otherwise use the config file option.
    fn merge_options(&self, config: Config) -> (PipelineOptions, LoggingOptions) {
        #[rustfmt::skip]
        let pipeline_options = PipelineOptions {
            queue_capacity: if self.queue_capacity != QUEUE_CAPACITY { self.queue_capacity } else { config.pipeline_options.queue_capacity },
            consumers: if self.threads != WorkerCount::Auto { self.threads.to_string() } else { config.pipeline_options.consumers },
            resolver: if self.resolver != ResolverKind::default() { self.resolver } else { config.pipeline_options.resolver },
            ip_protocol: if self.ip_proto != IpProtocol::default() { self.ip_proto } else { config.pipeline_options.ip_protocol },
        };

        #[rustfmt::skip]
        let logging_options = LoggingOptions {
            dir: if self.dir != CURRENT_DIR { self.dir.clone() } else { config.logging_options.dir },
            file: if self.file != LOGFILE_NAME { self.file.clone() } else { config.logging_options.file },
            json: if self.json != LOGGING_JSON { self.json } else { config.logging_options.json },
            quiet: if self.quiet != LOGGING_QUIET { self.quiet } else { config.logging_options.quiet },
        };

        (pipeline_options, logging_options)
    }

    async fn execute(&self, pipeline_options: PipelineOptions, logging_options: &LoggingOptions) -> Result<()> {
        // region:    ===== validators ===== //

        let consumers = pipeline_options
            .consumers
            .parse::<WorkerCount>()
            .and_then(|count| count.get())
            .context("invalid resolver thread count")?;

        let pipeline_config = PipelineConfig {
            sources: self.inputs.clone(),
            consumers,
            queue_capacity: pipeline_options.queue_capacity,
        };
        pipeline_config.validate()?;

        // endregion: ===== validators ===== //

        let sink = OutputSink::create(&self.output).await?;
        let resolver = Arc::new(Resolver::new(pipeline_options.resolver, pipeline_options.ip_protocol));

        if !logging_options.quiet {
            println!(
                "{}",
                pipeline_start_msg(
                    pipeline_config.sources.len(),
                    consumers,
                    pipeline_config.queue_capacity,
                    &self.output.display().to_string(),
                )
            );
        }

        let (summary, _file) = run_pipeline(&pipeline_config, resolver, sink).await?;

        if !logging_options.quiet {
            println!("{}", summary_msg(&summary, self.summary)?);
        }
        Ok(())
    }
}

/// File logging through a non-blocking appender, plus worker warnings on
/// stderr unless quiet. The guard must be held until logging is done.
fn init_tracing(logging_options: &LoggingOptions) -> WorkerGuard {
    let file_appender = rolling::never(&logging_options.dir, &logging_options.file);
    let (logfile, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}=info")));

    let file_layer = fmt::layer().with_writer(logfile).with_ansi(false).with_target(true);
    let file_layer = match logging_options.json {
        true => file_layer.json().boxed(),
        false => file_layer.boxed(),
    };

    // Per-source and per-item problems are reported from the worker modules.
    let stderr_layer = (!logging_options.quiet).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .with_filter(
                Targets::new()
                    .with_target(format!("{APP_NAME}::pipeline"), Level::WARN)
                    .with_target(format!("{APP_NAME}::dns"), Level::WARN),
            )
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}

/// Format example commands
fn format_examples(examples: &[&str]) -> String {
    let mut result = String::from("\x1B[1;4mExamples:\x1B[0m\n");
    for example in examples {
        result.push_str(&format!("  {}\n", example));
    }
    // Forces visible blank new line.
    // Otherwise, clap strips out raw trailing whitespace.
    result.push_str("\x1B[0m\n");
    result
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn last_path_is_the_output() {
        let cli = Cli::try_parse_from([APP_NAME, "a.txt", "b.txt", "out.txt"]).unwrap();
        assert_eq!(cli.inputs, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(cli.output, PathBuf::from("out.txt"));
        assert_eq!(cli.threads, WorkerCount::Auto);
    }

    #[test]
    fn missing_output_is_rejected() {
        assert!(Cli::try_parse_from([APP_NAME, "a.txt"]).is_err());
        assert!(Cli::try_parse_from([APP_NAME]).is_err());
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(Cli::try_parse_from([APP_NAME, "-t", "0", "a.txt", "out.txt"]).is_err());
    }

    #[test]
    fn cli_values_override_config() {
        let cli = Cli::try_parse_from([APP_NAME, "-t", "3", "-R", "hickory", "a.txt", "out.txt"]).unwrap();
        let mut config = Config::default();
        config.pipeline_options.queue_capacity = 64;
        config.pipeline_options.consumers = "8".to_owned();
        config.logging_options.quiet = true;

        let (pipeline, logging) = cli.merge_options(config);
        assert_eq!(pipeline.consumers, "3");
        assert_eq!(pipeline.resolver, ResolverKind::Hickory);
        assert_eq!(pipeline.queue_capacity, 64);
        assert!(logging.quiet);
    }
}
