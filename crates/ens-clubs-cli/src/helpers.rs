// SPDX-License-Identifier: Apache-2.0

use crate::{CliError, GlobalArgs, LogFlags, OutputMode};
use ens_clubs_core::{resolve_clubs_root_from, ENV_ENS_CLUBS_LOG_JSON, ENV_ENS_CLUBS_LOG_LEVEL};
use ens_clubs_holders::{HoldersConfig, HoldersError};
use ens_clubs_model::SnapshotDate;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Logs go to stderr so stdout stays a clean payload channel.
pub(crate) fn init_tracing(flags: LogFlags) {
    let fallback = if flags.verbose > 1 {
        "trace"
    } else if flags.verbose == 1 {
        "debug"
    } else if flags.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env(ENV_ENS_CLUBS_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    let registry = tracing_subscriber::registry().with(filter);
    let _ = if env_bool(ENV_ENS_CLUBS_LOG_JSON, false) {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
}

/// Environment first, then command-line flags on top.
pub(crate) fn load_config(globals: &GlobalArgs) -> Result<HoldersConfig, CliError> {
    let mut config = HoldersConfig::from_env()?;
    if let Some(root) = &globals.root {
        config.root = resolve_clubs_root_from(root.to_str());
    }
    if let Some(raw) = &globals.date {
        config.snapshot_date = SnapshotDate::parse(raw)
            .map_err(|e| HoldersError::config(format!("--date invalid: {}", e.0)))?;
    }
    if let Some(n) = globals.concurrency {
        config = config.with_concurrency(n)?;
    }
    Ok(config)
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("failed to start async runtime: {e}")))
}

pub(crate) fn emit_ok(output_mode: OutputMode, payload: Value) -> Result<(), CliError> {
    let rendered = if output_mode.json {
        serde_json::to_string(&payload)
    } else {
        serde_json::to_string_pretty(&payload)
    };
    println!(
        "{}",
        rendered.map_err(|e| CliError::internal(e.to_string()))?
    );
    Ok(())
}
