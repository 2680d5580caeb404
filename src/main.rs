use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use herald::config::HeraldConfig;
use herald::error::HeraldError;
use herald::notify::{LogNotifier, NotifyRequest, UserNotifier};
use herald::ratelimit::LimiterPool;
use herald::store::{CounterStore, MemoryCounterStore, RedisCounterStore};

#[derive(Debug, Parser)]
#[command(name = "herald", version, about = "Rate-limited user notifications")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep counters in this process instead of Redis
    #[arg(long, global = true)]
    memory: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record a hit and report whether the user is throttled
    Check {
        #[arg(long)]
        user: String,
        #[arg(long = "type")]
        message_type: String,
    },
    /// Send a notification through the logging notifier
    Notify {
        #[arg(long)]
        user: String,
        #[arg(long = "type")]
        message_type: String,
    },
    /// List the configured rate policies
    Policies,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = HeraldConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let policies = config.policies()?;
    info!(message_types = policies.len(), "Configuration loaded");

    if let Command::Policies = cli.command {
        let mut types: Vec<_> = policies.iter().collect();
        types.sort_by(|a, b| a.0.cmp(b.0));
        for (message_type, policy) in types {
            println!(
                "{message_type}: {} per {}s",
                policy.max_hits(),
                policy.window().as_secs()
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let store: Arc<dyn CounterStore> = if cli.memory {
        Arc::new(MemoryCounterStore::new())
    } else {
        let store =
            RedisCounterStore::connect_with_config(&config.redis.url, config.redis.store_config())
                .await
                .map_err(HeraldError::from)
                .with_context(|| format!("connecting to {}", config.redis.url))?;
        Arc::new(store)
    };
    let pool = Arc::new(LimiterPool::new(store, policies));

    match cli.command {
        Command::Check { user, message_type } => {
            let throttled = pool.reached(&user, &message_type).await?;
            let report = serde_json::json!({
                "user": user,
                "message_type": message_type,
                "throttled": throttled,
            });
            println!("{report}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Notify { user, message_type } => {
            let request = NotifyRequest::new(user, message_type);
            request.validate()?;

            let notifier = Arc::new(LogNotifier::new(config.notifier.sender.clone()));
            let service = UserNotifier::new(pool, notifier);

            match service.notify(&request.user_email, &request.message_type).await {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(e) if e.is_throttled() => {
                    error!(error = %e, "Too many requests");
                    Ok(ExitCode::from(2))
                }
                Err(e) => {
                    error!(error = %e, "Error notifying user");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Policies => Ok(ExitCode::SUCCESS),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
