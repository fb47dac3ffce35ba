//! state holders, one per screen.
//!
//! every field is an [`Observable`]. an operation updates the fields it owns
//! and reports failure through its `Result`; loading flags are cleared either
//! way. after `dispose` results still in flight are dropped unapplied.

use std::future::Future;

use tokio_util::sync::CancellationToken;

mod favorites;
mod movie_detail;
mod movie_list;
mod observable;
mod profile;
mod reviews;
mod search;

pub use favorites::FavoritesScreen;
pub use movie_detail::MovieDetailScreen;
pub use movie_list::{MovieListScreen, Page, PAGE_SIZE};
pub use observable::Observable;
pub use profile::ProfileScreen;
pub use reviews::ReviewsScreen;
pub use search::SearchScreen;

/// `fut`'s output, or `None` when `cancel` fires first.
pub(crate) async fn unless_disposed<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        r = fut => Some(r),
    }
}
