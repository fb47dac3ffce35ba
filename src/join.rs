use std::fmt::Debug;
use std::future::Future;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::repositories::{RepositoryError, Result};

/// runs one `lookup` per id concurrently and waits for every one of them.
///
/// a lookup that fails or finds nothing contributes nothing; the rest keep
/// the order of `ids`. there is no timeout: the join ends when the last
/// lookup does, or when `cancel` fires.
pub async fn resolve_all<I, T, F, Fut>(
    ids: I,
    cancel: &CancellationToken,
    mut lookup: F,
) -> Result<Vec<T>>
where
    I: IntoIterator,
    I::Item: Debug + Clone,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let pending = ids
        .into_iter()
        .map(|id| {
            let fut = lookup(id.clone());
            async move { (id, fut.await) }
        })
        .collect::<Vec<_>>();

    if pending.is_empty() {
        return Ok(vec![]);
    }

    let total = pending.len();
    let results = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RepositoryError::Cancelled),
        r = join_all(pending) => r,
    };

    let resolved = results
        .into_iter()
        .filter_map(|(id, r)| match r {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(?id, "lookup failed, leaving it out: {}", e);
                None
            },
        })
        .collect::<Vec<_>>();

    tracing::trace!(total, resolved = resolved.len(), "join complete");

    Ok(resolved)
}
