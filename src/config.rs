use std::fmt;

use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct AppConfig {
    #[clap(long, env, default_value_t = 5000)]
    pub port: u16,

    /// Base URL of the KRC-20 token endpoint; the ticker is appended as a path segment.
    #[clap(long, env, default_value = "https://api.kasplex.org/v1/krc20/token")]
    pub upstream_url: String,

    /// Upstream request timeout, in seconds.
    #[clap(long, env, default_value_t = 10)]
    pub upstream_timeout: u64,

    /// Ticker served when a request omits `token`.
    #[clap(long, env, default_value = "NACHO")]
    pub default_token: String,

    #[clap(long, env, default_value_t = u64::MAX)]
    pub req_per_sec: u64,

    /// Sent as `X-Source-Code` on every response when set.
    #[clap(long, env)]
    pub source_url: Option<String>,

    #[clap(flatten)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct LogConfig {
    /// Default level, overridden by `RUST_LOG`.
    #[clap(long, env, default_value_t = LevelFilter::INFO)]
    pub log_level: LevelFilter,

    #[clap(long, env, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl LogConfig {
    const QUIET_CRATES: [&'static str; 5] = ["hyper", "reqwest", "rustls", "h2", "tower_http"];

    pub fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::builder()
            .with_default_directive(self.log_level.into())
            .from_env_lossy();

        for crate_name in Self::QUIET_CRATES {
            if let Ok(directive) = format!("{crate_name}=warn").parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }

        filter
    }

    pub fn init(&self) {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_target(false);

        match self.log_format {
            LogFormat::Text => builder.compact().init(),
            LogFormat::Json => builder.json().init(),
        }
    }
}
