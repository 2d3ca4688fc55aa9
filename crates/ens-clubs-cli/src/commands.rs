// SPDX-License-Identifier: Apache-2.0

use crate::helpers::{emit_ok, load_config, runtime};
use crate::{CliError, GlobalArgs, OutputMode};
use ens_clubs_holders::{
    add_category, parse_names, rank_holders, resolve_category, resolve_only_failures,
    walk_categories, HoldersError, HoldersReport, WalkOutcome,
};
use ens_clubs_store::{CategoryName, LocalFsStore};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

pub(crate) struct HoldersArgs {
    pub(crate) category: Option<String>,
    pub(crate) exclude: Vec<String>,
    pub(crate) labels: Option<String>,
    pub(crate) parallel: usize,
}

fn report_payload(report: &HoldersReport) -> Value {
    json!({
        "category": report.category,
        "snapshot_date": report.snapshot_date,
        "mode": report.mode,
        "attempted": report.attempted,
        "resolved": report.resolved,
        "failed": report.failed,
        "expired": report.expired,
        "owners": report.owners,
        "failed_labels": report.failed_labels,
        "clean": report.is_clean(),
    })
}

fn parse_categories(raw: &[String]) -> Result<Vec<CategoryName>, CliError> {
    raw.iter()
        .map(|c| CategoryName::parse(c.as_str()).map_err(CliError::from))
        .collect()
}

/// Prints every outcome, then fails with the first category error if any.
fn finish_walk<T>(
    command: &str,
    outcomes: Vec<WalkOutcome<T>>,
    render: impl Fn(&T) -> Value,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let mut first_error: Option<HoldersError> = None;
    let mut rows = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome.result {
            Ok(value) => rows.push(json!({
                "category": outcome.category.as_str(),
                "status": "ok",
                "result": render(&value),
            })),
            Err(err) => {
                rows.push(json!({
                    "category": outcome.category.as_str(),
                    "status": "error",
                    "error": {"code": err.kind.as_str(), "message": err.message},
                }));
                first_error.get_or_insert(err);
            }
        }
    }
    let failed = rows.iter().filter(|r| r["status"] == "error").count();
    emit_ok(
        output_mode,
        json!({"command": command, "categories": rows, "failed_categories": failed}),
    )?;
    match first_error {
        Some(err) => Err(CliError::from(err).with_detail("failed_categories", &failed.to_string())),
        None => Ok(()),
    }
}

pub(crate) fn run_holders(
    globals: &GlobalArgs,
    args: HoldersArgs,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let config = load_config(globals)?;
    let resolver = config.build_resolver()?;
    let store = Arc::new(config.store());
    let mut options = config.options();
    if let Some(raw) = &args.labels {
        options = options.with_labels(parse_names(raw)?);
    }
    let rt = runtime()?;

    match args.category {
        Some(raw) => {
            let category = CategoryName::parse(raw)?;
            let report =
                rt.block_on(resolve_category(&*store, &resolver, &category, &options))?;
            emit_ok(
                output_mode,
                json!({"command": "holders", "report": report_payload(&report)}),
            )
        }
        None => {
            if args.labels.is_some() {
                return Err(CliError::usage("--labels needs an explicit category"));
            }
            let exclude = parse_categories(&args.exclude)?;
            let outcomes = rt.block_on(walk_categories(
                &*store,
                &exclude,
                args.parallel,
                |category| {
                    let store: Arc<LocalFsStore> = Arc::clone(&store);
                    let resolver = resolver.clone();
                    let options = options.clone();
                    async move { resolve_category(&*store, &resolver, &category, &options).await }
                },
            ))?;
            finish_walk("holders", outcomes, report_payload, output_mode)
        }
    }
}

pub(crate) fn run_fix_holders(
    globals: &GlobalArgs,
    category: Option<String>,
    exclude: &[String],
    parallel: usize,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let config = load_config(globals)?;
    let resolver = config.build_resolver()?;
    let store = Arc::new(config.store());
    let options = config.options();
    let rt = runtime()?;

    match category {
        Some(raw) => {
            let category = CategoryName::parse(raw)?;
            let report =
                rt.block_on(resolve_only_failures(&*store, &resolver, &category, &options))?;
            emit_ok(
                output_mode,
                json!({"command": "fix-holders", "report": report_payload(&report)}),
            )
        }
        None => {
            let exclude = parse_categories(exclude)?;
            let outcomes = rt.block_on(walk_categories(
                &*store,
                &exclude,
                parallel,
                |category| {
                    let store: Arc<LocalFsStore> = Arc::clone(&store);
                    let resolver = resolver.clone();
                    let options = options.clone();
                    async move {
                        resolve_only_failures(&*store, &resolver, &category, &options).await
                    }
                },
            ))?;
            finish_walk("fix-holders", outcomes, report_payload, output_mode)
        }
    }
}

pub(crate) fn run_sort_holders(
    globals: &GlobalArgs,
    category: Option<String>,
    exclude: &[String],
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let config = load_config(globals)?;
    let store = Arc::new(config.store());
    let date = config.snapshot_date;

    match category {
        Some(raw) => {
            let category = CategoryName::parse(raw)?;
            let out = rank_holders(&*store, &category, date)?;
            emit_ok(
                output_mode,
                json!({
                    "command": "sort-holders",
                    "category": category.as_str(),
                    "snapshot_date": date,
                    "owners": out.ranked.data.len(),
                }),
            )
        }
        None => {
            let exclude = parse_categories(exclude)?;
            let rt = runtime()?;
            let outcomes = rt.block_on(walk_categories(&*store, &exclude, 1, |category| {
                let store: Arc<LocalFsStore> = Arc::clone(&store);
                async move {
                    tokio::task::spawn_blocking(move || {
                        rank_holders(&*store, &category, date).map(|out| out.ranked.data.len())
                    })
                    .await
                    .map_err(|e| HoldersError::internal(format!("ranking task failed: {e}")))?
                }
            }))?;
            finish_walk(
                "sort-holders",
                outcomes,
                |owners| json!({"owners": owners}),
                output_mode,
            )
        }
    }
}

pub(crate) fn run_add(
    globals: &GlobalArgs,
    category: &str,
    file: &Path,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let config = load_config(globals)?;
    let store = config.store();
    let category = CategoryName::parse(category)?;
    let raw = std::fs::read_to_string(file).map_err(|e| {
        HoldersError::input(format!("cannot read names from {}: {e}", file.display()))
    })?;
    let record = add_category(&store, &category, parse_names(&raw)?)?;
    emit_ok(
        output_mode,
        json!({
            "command": "add",
            "category": category.as_str(),
            "supply": record.info.supply,
        }),
    )
}

pub(crate) fn run_config(globals: &GlobalArgs, output_mode: OutputMode) -> Result<(), CliError> {
    let config = load_config(globals)?;
    let payload = serde_json::to_value(&config).map_err(|e| CliError::internal(e.to_string()))?;
    emit_ok(output_mode, json!({"command": "config", "config": payload}))
}
