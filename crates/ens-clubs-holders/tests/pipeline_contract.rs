// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use ens_clubs_holders::{
    add_category, resolve_category, resolve_only_failures, walk_categories, HoldersErrorKind,
    HoldersOptions, JobMode, OwnerResolver, PageError, RecordPageFetcher, RegistryError,
    RegistryReader,
};
use ens_clubs_model::{
    CategoryInfo, CategoryRecord, Entry, HoldersSnapshot, Identifier, Label, OwnerAddress,
    OwnerIndex, RankedSnapshot, SnapshotDate,
};
use ens_clubs_store::{CategoryName, ClubStore, LocalFsStore, StoreError, StoreErrorCode};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

fn owner(n: u8) -> OwnerAddress {
    OwnerAddress::parse(&format!("0x{}", format!("{n:02x}").repeat(20))).expect("owner")
}

fn label(raw: &str) -> Label {
    Label::parse(raw).expect("label")
}

fn id_of(raw: &str) -> Identifier {
    Identifier::from_label(&label(raw))
}

fn date() -> SnapshotDate {
    SnapshotDate::parse("2022-05-16").expect("date")
}

fn category(name: &str) -> CategoryName {
    CategoryName::parse(name).expect("category")
}

fn options() -> HoldersOptions {
    HoldersOptions::default()
        .with_concurrency(3)
        .with_snapshot_date(date())
}

#[derive(Default)]
struct ScriptedRegistry {
    answers: Mutex<HashMap<Identifier, Result<OwnerAddress, RegistryError>>>,
    calls: AtomicUsize,
}

impl ScriptedRegistry {
    fn answer(&self, raw: &str, answer: Result<OwnerAddress, RegistryError>) {
        self.answers
            .lock()
            .expect("answers lock")
            .insert(id_of(raw), answer);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryReader for ScriptedRegistry {
    fn tier_tag(&self) -> &'static str {
        "scripted"
    }

    async fn owner_of(&self, id: &Identifier) -> Result<OwnerAddress, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.answers
            .lock()
            .expect("answers lock")
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(RegistryError::Transport("unscripted".to_string())))
    }
}

/// Registry that answers every identifier with the same owner after a short
/// delay, recording the highest number of calls in flight at once.
#[derive(Default)]
struct SlowRegistry {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowRegistry {
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryReader for SlowRegistry {
    fn tier_tag(&self) -> &'static str {
        "slow"
    }

    async fn owner_of(&self, _id: &Identifier) -> Result<OwnerAddress, RegistryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(owner(7))
    }
}

#[derive(Default)]
struct ScriptedPage {
    answers: Mutex<HashMap<Identifier, Result<OwnerAddress, PageError>>>,
}

impl ScriptedPage {
    fn answer(&self, raw: &str, answer: Result<OwnerAddress, PageError>) {
        self.answers
            .lock()
            .expect("answers lock")
            .insert(id_of(raw), answer);
    }
}

#[async_trait]
impl RecordPageFetcher for ScriptedPage {
    fn tier_tag(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_owner(&self, id: &Identifier) -> Result<OwnerAddress, PageError> {
        self.answers
            .lock()
            .expect("answers lock")
            .get(id)
            .cloned()
            .unwrap_or(Err(PageError::Unavailable))
    }
}

/// Local store that counts category snapshot writes and can fail once a
/// write budget is spent.
struct CountingStore {
    inner: LocalFsStore,
    snapshot_writes: AtomicUsize,
    fail_after: Option<usize>,
}

impl CountingStore {
    fn new(root: &Path, fail_after: Option<usize>) -> Self {
        Self {
            inner: LocalFsStore::new(root.to_path_buf()),
            snapshot_writes: AtomicUsize::new(0),
            fail_after,
        }
    }

    fn writes(&self) -> usize {
        self.snapshot_writes.load(Ordering::SeqCst)
    }
}

impl ClubStore for CountingStore {
    fn list_categories(&self) -> Result<Vec<CategoryName>, StoreError> {
        self.inner.list_categories()
    }

    fn read_category(&self, category: &CategoryName) -> Result<CategoryRecord, StoreError> {
        self.inner.read_category(category)
    }

    fn write_category(
        &self,
        category: &CategoryName,
        record: &CategoryRecord,
    ) -> Result<(), StoreError> {
        self.inner.write_category(category, record)
    }

    fn read_category_snapshot(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
    ) -> Result<Option<CategoryRecord>, StoreError> {
        self.inner.read_category_snapshot(category, date)
    }

    fn write_category_snapshot(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        record: &CategoryRecord,
    ) -> Result<(), StoreError> {
        let done = self.snapshot_writes.load(Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| done >= limit) {
            return Err(StoreError::new(StoreErrorCode::Io, "disk full"));
        }
        self.snapshot_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_category_snapshot(category, date, record)
    }

    fn read_holders(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
    ) -> Result<Option<HoldersSnapshot>, StoreError> {
        self.inner.read_holders(category, date)
    }

    fn write_holders(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        info: &CategoryInfo,
        index: &OwnerIndex,
    ) -> Result<(), StoreError> {
        self.inner.write_holders(category, date, info, index)
    }

    fn write_ranked(
        &self,
        category: &CategoryName,
        date: SnapshotDate,
        ranked: &RankedSnapshot,
    ) -> Result<(), StoreError> {
        self.inner.write_ranked(category, date, ranked)
    }
}

const LABELS: [&str; 6] = ["000", "001", "002", "003", "004", "005"];

fn seed(store: &dyn ClubStore, name: &str) {
    add_category(store, &category(name), LABELS.iter().map(|l| label(l)).collect())
        .expect("seed category");
}

fn tiers() -> (Arc<ScriptedRegistry>, Arc<ScriptedPage>, OwnerResolver) {
    let registry = Arc::new(ScriptedRegistry::default());
    let page = Arc::new(ScriptedPage::default());
    let resolver = OwnerResolver::new(registry.clone(), page.clone());
    (registry, page, resolver)
}

fn label_set(index: &OwnerIndex, who: &OwnerAddress) -> BTreeSet<String> {
    index
        .labels_of(who)
        .unwrap_or_default()
        .iter()
        .map(|l| l.as_str().to_string())
        .collect()
}

fn set(raw: &[&str]) -> BTreeSet<String> {
    raw.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn full_run_accounts_for_every_label_and_builds_the_owner_index() {
    let root = tempdir().expect("tempdir");
    let store = LocalFsStore::new(root.path().to_path_buf());
    seed(&store, "The999");
    let (registry, _page, resolver) = tiers();
    for (i, raw) in LABELS.iter().enumerate().take(5) {
        registry.answer(raw, Ok(owner(1 + (i % 2) as u8)));
    }

    let report = resolve_category(&store, &resolver, &category("The999"), &options())
        .await
        .expect("run");
    assert_eq!(report.mode, JobMode::Full);
    assert_eq!(report.attempted, 6);
    assert_eq!(report.resolved, 5);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_labels, vec![label("005")]);
    assert_eq!(report.owners, 2);

    let snapshot = store
        .read_category_snapshot(&category("The999"), date())
        .expect("read")
        .expect("snapshot");
    assert_eq!(snapshot.data.len(), 6);
    for raw in LABELS {
        match snapshot.entry(&label(raw)).expect("entry") {
            Entry::Resolved(resolved) => {
                assert_eq!(resolved.id, id_of(raw));
                assert_eq!(resolved.name, format!("{raw}.eth"));
            }
            Entry::Unresolved(id) => {
                assert_eq!(raw, "005");
                assert_eq!(id, &id_of(raw));
            }
        }
    }
    assert_eq!(snapshot.info.owners, Some(2));

    let holders = store
        .read_holders(&category("The999"), date())
        .expect("read")
        .expect("holders");
    assert_eq!(label_set(&holders.data, &owner(1)), set(&["000", "002", "004"]));
    assert_eq!(label_set(&holders.data, &owner(2)), set(&["001", "003"]));
    assert_eq!(holders.data.label_count(), 5);
    assert_eq!(holders.info.owners, Some(2));
}

#[tokio::test]
async fn revert_recovered_by_page_is_resolved_and_marked_expired() {
    let root = tempdir().expect("tempdir");
    let store = LocalFsStore::new(root.path().to_path_buf());
    seed(&store, "10k");
    let (registry, page, resolver) = tiers();
    for raw in LABELS {
        registry.answer(raw, Ok(owner(7)));
    }
    registry.answer(
        "003",
        Err(RegistryError::Reverted("execution reverted".to_string())),
    );
    page.answer("003", Ok(owner(9)));

    let report = resolve_category(&store, &resolver, &category("10k"), &options())
        .await
        .expect("run");
    assert_eq!(report.failed, 0);
    assert_eq!(report.expired, 1);
    let expired_event = report
        .events
        .iter()
        .find(|e| e.fields.get("label").map(String::as_str) == Some("003"))
        .expect("label event");
    assert_eq!(expired_event.name, "holders.label.resolved");
    assert_eq!(expired_event.fields.get("expired").map(String::as_str), Some("true"));

    let snapshot = store
        .read_category_snapshot(&category("10k"), date())
        .expect("read")
        .expect("snapshot");
    assert_eq!(
        snapshot.entry(&label("003")).and_then(Entry::owner),
        Some(&owner(9))
    );
}

#[tokio::test]
async fn total_failure_keeps_the_bare_identifier() {
    let root = tempdir().expect("tempdir");
    let store = LocalFsStore::new(root.path().to_path_buf());
    seed(&store, "24h");
    let (registry, page, resolver) = tiers();
    for raw in LABELS {
        registry.answer(raw, Ok(owner(1)));
    }
    registry.answer("002", Err(RegistryError::Transport("timeout".to_string())));
    page.answer("002", Err(PageError::Status(404)));

    let report = resolve_category(&store, &resolver, &category("24h"), &options())
        .await
        .expect("run");
    assert_eq!(report.failed_labels, vec![label("002")]);
    assert_eq!(report.expired, 0);
    let snapshot = store
        .read_category_snapshot(&category("24h"), date())
        .expect("read")
        .expect("snapshot");
    assert_eq!(
        snapshot.entry(&label("002")),
        Some(&Entry::Unresolved(id_of("002")))
    );
}

#[tokio::test]
async fn fixing_with_no_failures_touches_nothing() {
    let root = tempdir().expect("tempdir");
    let local = LocalFsStore::new(root.path().to_path_buf());
    seed(&local, "hyphens");
    let (registry, _page, resolver) = tiers();
    for raw in LABELS {
        registry.answer(raw, Ok(owner(3)));
    }
    resolve_category(&local, &resolver, &category("hyphens"), &options())
        .await
        .expect("run");
    let calls_before = registry.calls();

    let counting = CountingStore::new(root.path(), None);
    let report = resolve_only_failures(&counting, &resolver, &category("hyphens"), &options())
        .await
        .expect("fix");
    assert_eq!(report.mode, JobMode::FailureFix);
    assert_eq!(report.attempted, 0);
    assert_eq!(counting.writes(), 0);
    assert_eq!(registry.calls(), calls_before);
}

#[tokio::test]
async fn crash_mid_run_loses_nothing_and_fix_resolves_only_the_rest() {
    let root = tempdir().expect("tempdir");
    let local = LocalFsStore::new(root.path().to_path_buf());
    seed(&local, "0xN");
    let (registry, _page, resolver) = tiers();
    for (i, raw) in LABELS.iter().enumerate() {
        registry.answer(raw, Ok(owner(1 + (i % 3) as u8)));
    }

    let crashing = CountingStore::new(root.path(), Some(2));
    let err = resolve_category(
        &crashing,
        &resolver,
        &category("0xN"),
        &options().with_concurrency(1),
    )
    .await
    .expect_err("persist failure aborts the run");
    assert_eq!(err.kind, HoldersErrorKind::Persist);

    let partial = local
        .read_category_snapshot(&category("0xN"), date())
        .expect("read")
        .expect("partial snapshot");
    assert_eq!(partial.resolved_count(), 2);
    let settled: Vec<(Label, Entry)> = partial
        .data
        .iter()
        .filter(|(_, e)| e.is_resolved())
        .map(|(l, e)| (l.clone(), e.clone()))
        .collect();

    let (fresh, _page, fresh_resolver) = tiers();
    for raw in LABELS {
        fresh.answer(raw, Ok(owner(4)));
    }
    let report = resolve_only_failures(&local, &fresh_resolver, &category("0xN"), &options())
        .await
        .expect("fix");
    assert_eq!(report.attempted, 4);
    assert_eq!(fresh.calls(), 4);
    assert_eq!(report.resolved, 4);

    let finished = local
        .read_category_snapshot(&category("0xN"), date())
        .expect("read")
        .expect("snapshot");
    assert_eq!(finished.resolved_count(), 6);
    for (l, e) in settled {
        assert_eq!(finished.entry(&l), Some(&e));
    }
    let holders = local
        .read_holders(&category("0xN"), date())
        .expect("read")
        .expect("holders");
    assert_eq!(holders.data.label_count(), 6);
    assert_eq!(label_set(&holders.data, &owner(4)).len(), 4);
}

#[tokio::test]
async fn subset_run_rejects_unknown_labels_before_any_work() {
    let root = tempdir().expect("tempdir");
    let store = LocalFsStore::new(root.path().to_path_buf());
    seed(&store, "club");
    let (registry, _page, resolver) = tiers();

    let opts = options().with_labels(vec![label("000"), label("zzz")]);
    let err = resolve_category(&store, &resolver, &category("club"), &opts)
        .await
        .expect_err("unknown label");
    assert_eq!(err.kind, HoldersErrorKind::Input);
    assert_eq!(registry.calls(), 0);
    assert!(!root.path().join("snapshots").exists());
}

#[tokio::test]
async fn subset_run_augments_existing_holders() {
    let root = tempdir().expect("tempdir");
    let store = LocalFsStore::new(root.path().to_path_buf());
    seed(&store, "club");
    let (registry, _page, resolver) = tiers();
    for raw in LABELS {
        registry.answer(raw, Ok(owner(1)));
    }
    registry.answer("004", Err(RegistryError::Empty));
    resolve_category(&store, &resolver, &category("club"), &options())
        .await
        .expect("first run");

    registry.answer("004", Ok(owner(2)));
    registry.answer("000", Ok(owner(2)));
    let opts = options().with_labels(vec![label("004"), label("000")]);
    let report = resolve_category(&store, &resolver, &category("club"), &opts)
        .await
        .expect("subset run");
    assert_eq!(report.mode, JobMode::Subset);
    assert_eq!(report.resolved, 2);

    let holders = store
        .read_holders(&category("club"), date())
        .expect("read")
        .expect("holders");
    assert_eq!(
        label_set(&holders.data, &owner(1)),
        set(&["001", "002", "003", "005"])
    );
    assert_eq!(label_set(&holders.data, &owner(2)), set(&["000", "004"]));
    assert_eq!(holders.data.label_count(), 6);
}

#[tokio::test]
async fn fixing_without_a_snapshot_is_an_input_error() {
    let root = tempdir().expect("tempdir");
    let store = LocalFsStore::new(root.path().to_path_buf());
    seed(&store, "club");
    let (_registry, _page, resolver) = tiers();
    let err = resolve_only_failures(&store, &resolver, &category("club"), &options())
        .await
        .expect_err("no snapshot");
    assert_eq!(err.kind, HoldersErrorKind::Input);
}

#[tokio::test]
async fn walk_skips_excluded_categories() {
    let root = tempdir().expect("tempdir");
    let store = Arc::new(LocalFsStore::new(root.path().to_path_buf()));
    for name in ["alpha", "beta", "gamma"] {
        seed(&*store, name);
    }
    let (registry, _page, resolver) = tiers();
    for raw in LABELS {
        registry.answer(raw, Ok(owner(5)));
    }

    let outcomes = walk_categories(&*store, &[category("Beta")], 2, |cat| {
        let store = Arc::clone(&store);
        let resolver = resolver.clone();
        async move { resolve_category(&*store, &resolver, &cat, &options()).await }
    })
    .await
    .expect("walk");

    let names: Vec<&str> = outcomes.iter().map(|o| o.category.as_str()).collect();
    assert_eq!(names, vec!["alpha", "gamma"]);
    for outcome in &outcomes {
        assert_eq!(outcome.result.as_ref().expect("category run").resolved, 6);
    }
    assert!(store
        .read_holders(&category("beta"), date())
        .expect("read")
        .is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resolutions_in_flight_never_exceed_the_concurrency_limit() {
    let root = tempdir().expect("tempdir");
    let store = LocalFsStore::new(root.path().to_path_buf());
    let labels: Vec<Label> = (0..60).map(|i| label(&format!("{i:03}"))).collect();
    add_category(&store, &category("wide"), labels).expect("seed category");
    let registry = Arc::new(SlowRegistry::default());
    let resolver = OwnerResolver::new(registry.clone(), Arc::new(ScriptedPage::default()));
    let options = HoldersOptions::default()
        .with_concurrency(4)
        .with_snapshot_date(date());

    let report = resolve_category(&store, &resolver, &category("wide"), &options)
        .await
        .expect("run");
    assert!(registry.peak() <= 4, "peak in flight {}", registry.peak());
    assert!(registry.peak() > 1, "resolutions never overlapped");
    assert_eq!(report.attempted, 60);
    assert_eq!(report.resolved, 60);
    assert_eq!(report.failed, 0);

    let snapshot = store
        .read_category_snapshot(&category("wide"), date())
        .expect("read")
        .expect("snapshot");
    assert_eq!(snapshot.data.len(), 60);
    let holders = store
        .read_holders(&category("wide"), date())
        .expect("read")
        .expect("holders");
    assert_eq!(holders.data.owner_count(), 1);
    assert_eq!(holders.data.label_count(), 60);
}
