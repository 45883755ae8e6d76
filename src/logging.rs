//! Console logging.
//!
//! The level follows the `-v` count (WARN, INFO, DEBUG). `RUST_LOG`, when
//! set, takes precedence. The AWS SDK is kept at WARN unless `RUST_LOG`
//! names it.

use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

const QUIET_CRATES: [&str; 9] = [
    "aws_config",
    "aws_http",
    "aws_sdk_cloudwatchlogs",
    "aws_sdk_sqs",
    "aws_sdk_sts",
    "aws_smithy_client",
    "aws_smithy_http",
    "aws_smithy_http_tower",
    "hyper",
];

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid log directive: {0}")]
    Directive(#[from] tracing_subscriber::filter::ParseError),

    #[error("Logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// The default level for everything, with the AWS SDK held at WARN unless
/// `RUST_LOG` is in charge.
fn build_filter(level: LevelFilter, from_env: bool) -> Result<EnvFilter, Error> {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    if from_env {
        return Ok(builder.from_env_lossy());
    }

    let mut filter = builder.parse_lossy("");
    for name in QUIET_CRATES {
        filter = filter.add_directive(format!("{}=warn", name).parse()?);
    }
    Ok(filter)
}

pub fn init(verbosity: u8) -> Result<(), Error> {
    let level = level_for(verbosity);
    let filter = build_filter(level, std::env::var_os(EnvFilter::DEFAULT_ENV).is_some())?;

    let fmt_layer = if verbosity > 1 {
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().compact().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
