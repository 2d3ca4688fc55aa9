// SPDX-License-Identifier: Apache-2.0

use crate::HoldersError;
use ens_clubs_store::{CategoryName, ClubStore};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug)]
pub struct WalkOutcome<T> {
    pub category: CategoryName,
    pub result: Result<T, HoldersError>,
}

/// Applies `op` to every category in the store except `exclude`, at most
/// `parallel` categories at a time. A failing category does not stop the
/// others; outcomes come back sorted by category name.
pub async fn walk_categories<F, Fut, T>(
    store: &dyn ClubStore,
    exclude: &[CategoryName],
    parallel: usize,
    op: F,
) -> Result<Vec<WalkOutcome<T>>, HoldersError>
where
    F: Fn(CategoryName) -> Fut,
    Fut: Future<Output = Result<T, HoldersError>> + Send + 'static,
    T: Send + 'static,
{
    let excluded: Vec<String> = exclude.iter().map(CategoryName::file_stem).collect();
    let categories: Vec<CategoryName> = store
        .list_categories()?
        .into_iter()
        .filter(|c| !excluded.contains(&c.file_stem()))
        .collect();
    tracing::info!(
        categories = categories.len(),
        excluded = excluded.len(),
        parallel,
        "holders.walk.start"
    );

    let semaphore = Arc::new(Semaphore::new(parallel.max(1)));
    let mut tasks = JoinSet::new();
    for category in categories {
        let fut = op(category.clone());
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            WalkOutcome {
                category,
                result: fut.await,
            }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                if let Err(e) = &outcome.result {
                    tracing::warn!(
                        category = %outcome.category,
                        error = %e,
                        "holders.walk.category_failed"
                    );
                }
                outcomes.push(outcome);
            }
            Err(e) => {
                tasks.abort_all();
                return Err(HoldersError::internal(format!("walk task failed: {e}")));
            }
        }
    }
    outcomes.sort_by(|a, b| a.category.cmp(&b.category));
    Ok(outcomes)
}
