// SPDX-License-Identifier: Apache-2.0

use crate::job::{JobMode, ResolutionJob};
use crate::logging::{fields, HoldersLog, HoldersStage};
use crate::resolver::{OwnerResolver, Resolution, ResolutionOutcome};
use crate::{HoldersError, HoldersOptions, HoldersReport};
use ens_clubs_model::{
    CategoryRecord, Entry, Identifier, Label, OwnerIndex, ResolvedEntry, SnapshotDate,
};
use ens_clubs_store::{CategoryName, ClubStore};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, info_span, warn, Instrument};

/// Resolves every label of `category` (or the explicit `options.labels`
/// subset, augmenting the dated snapshots).
pub async fn resolve_category(
    store: &dyn ClubStore,
    resolver: &OwnerResolver,
    category: &CategoryName,
    options: &HoldersOptions,
) -> Result<HoldersReport, HoldersError> {
    let mode = if options.labels.is_some() {
        JobMode::Subset
    } else {
        JobMode::Full
    };
    let job = ResolutionJob::load(store, category, options, mode)?;
    run_job(store, resolver, job, options.concurrency).await
}

/// Re-resolves only the labels still unresolved in the dated snapshot. With
/// nothing left to resolve no file is touched.
pub async fn resolve_only_failures(
    store: &dyn ClubStore,
    resolver: &OwnerResolver,
    category: &CategoryName,
    options: &HoldersOptions,
) -> Result<HoldersReport, HoldersError> {
    let job = ResolutionJob::load(store, category, options, JobMode::FailureFix)?;
    run_job(store, resolver, job, options.concurrency).await
}

struct Completed {
    label: Label,
    id: Identifier,
    resolution: Resolution,
}

async fn run_job(
    store: &dyn ClubStore,
    resolver: &OwnerResolver,
    job: ResolutionJob,
    concurrency: usize,
) -> Result<HoldersReport, HoldersError> {
    let ResolutionJob {
        category,
        snapshot_date,
        mode,
        labels,
        mut record,
        mut index,
    } = job;
    let span = info_span!(
        "holders_run",
        category = %category,
        date = %snapshot_date,
        mode = mode.as_str()
    );

    async move {
        let mut log = HoldersLog::default();
        let mut report = HoldersReport {
            category: category.as_str().to_string(),
            snapshot_date,
            mode,
            attempted: labels.len(),
            resolved: 0,
            failed: 0,
            expired: 0,
            owners: index.owner_count(),
            failed_labels: Vec::new(),
            events: Vec::new(),
        };
        info!(labels = labels.len(), concurrency, "holders.start");
        log.emit(
            HoldersStage::Load,
            "holders.start",
            fields([
                ("labels", labels.len().to_string()),
                ("concurrency", concurrency.to_string()),
            ]),
        );
        if labels.is_empty() {
            log.emit(HoldersStage::Finalize, "holders.nothing_to_do", fields([]));
            report.events = log.into_events();
            return Ok(report);
        }

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for label in labels {
            let id = record
                .entry(&label)
                .map(|entry| entry.id().clone())
                .ok_or_else(|| {
                    HoldersError::internal(format!("label `{label}` vanished from the record"))
                })?;
            let resolver = resolver.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let resolution = resolver.resolve(&id, &label).await;
                Completed {
                    label,
                    id,
                    resolution,
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let done = match joined {
                Ok(done) => done,
                Err(e) => {
                    tasks.abort_all();
                    return Err(HoldersError::internal(format!(
                        "resolution task failed: {e}"
                    )));
                }
            };
            record_outcome(&mut report, &mut log, &done);
            let index_changed = apply_resolution(&mut record, &mut index, &done);
            let persisted = blocking_write(|| {
                persist(
                    store,
                    &category,
                    snapshot_date,
                    &record,
                    &index,
                    index_changed,
                )
            });
            if let Err(e) = persisted {
                tasks.abort_all();
                warn!(label = %done.label, error = %e, "holders.persist.failed");
                log.emit(
                    HoldersStage::Persist,
                    "holders.persist.failed",
                    fields([
                        ("label", done.label.to_string()),
                        ("error", e.to_string()),
                    ]),
                );
                return Err(e);
            }
        }

        report.owners = index.owner_count();
        report.failed_labels.sort();
        info!(
            resolved = report.resolved,
            failed = report.failed,
            expired = report.expired,
            owners = report.owners,
            "holders.done"
        );
        log.emit(
            HoldersStage::Finalize,
            "holders.done",
            fields([
                ("resolved", report.resolved.to_string()),
                ("failed", report.failed.to_string()),
                ("expired", report.expired.to_string()),
                ("owners", report.owners.to_string()),
            ]),
        );
        report.events = log.into_events();
        Ok::<HoldersReport, HoldersError>(report)
    }
    .instrument(span)
    .await
}

fn record_outcome(report: &mut HoldersReport, log: &mut HoldersLog, done: &Completed) {
    let expired = done.resolution.expired;
    if expired {
        report.expired += 1;
    }
    match &done.resolution.outcome {
        ResolutionOutcome::Resolved(owner) => {
            report.resolved += 1;
            info!(label = %done.label, owner = %owner, expired, "holders.label.resolved");
            log.emit(
                HoldersStage::Resolve,
                "holders.label.resolved",
                fields([
                    ("label", done.label.to_string()),
                    ("owner", owner.to_string()),
                    ("expired", expired.to_string()),
                ]),
            );
        }
        ResolutionOutcome::Failed(reason) => {
            report.failed += 1;
            report.failed_labels.push(done.label.clone());
            warn!(label = %done.label, reason = %reason, expired, "holders.label.failed");
            log.emit(
                HoldersStage::Resolve,
                "holders.label.failed",
                fields([
                    ("label", done.label.to_string()),
                    ("reason", reason.to_string()),
                    ("expired", expired.to_string()),
                ]),
            );
        }
    }
}

/// Folds one completion into the record and the owner index. Returns whether
/// the index changed.
fn apply_resolution(record: &mut CategoryRecord, index: &mut OwnerIndex, done: &Completed) -> bool {
    let mut changed = index.forget_label(&done.label);
    let entry = match done.resolution.owner() {
        Some(owner) => {
            changed |= index.record(owner.clone(), done.label.clone());
            Entry::Resolved(ResolvedEntry::new(
                done.id.clone(),
                done.label.clone(),
                owner.clone(),
            ))
        }
        None => Entry::Unresolved(done.id.clone()),
    };
    record.set_entry(&done.label, entry);
    record.info.owners = Some(index.owner_count());
    changed
}

/// Store writes fsync. On a multi-thread runtime they go through
/// `block_in_place` so in-flight resolutions keep their workers.
fn blocking_write<T>(write: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(write)
        }
        _ => write(),
    }
}

/// Holders first, category last: the category snapshot is what the
/// failure-fix pass reads, so a label only counts as done once both landed.
fn persist(
    store: &dyn ClubStore,
    category: &CategoryName,
    date: SnapshotDate,
    record: &CategoryRecord,
    index: &OwnerIndex,
    index_changed: bool,
) -> Result<(), HoldersError> {
    if index_changed {
        store
            .write_holders(category, date, &record.info, index)
            .map_err(|e| HoldersError::persist(e.to_string()))?;
    }
    store
        .write_category_snapshot(category, date, record)
        .map_err(|e| HoldersError::persist(e.to_string()))?;
    Ok(())
}
