//! Cursor-paginated id listing
//!
//! The id endpoints return one page at a time together with a
//! `next_cursor`; a cursor of zero marks the last page. These helpers walk
//! the cursor chain and collect every id into one set. Errors are returned
//! as soon as a page fails; nothing is retried.

use crate::remote::{RemoteResult, SocialGraph};
use crate::types::{IdPage, IdSet, UserId};

/// Which id listing to page through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdResource {
    /// Accounts following this screen name
    FollowersOf(String),
    /// Accounts this screen name follows
    FriendsOf(String),
    /// Accounts muted by the authenticated user
    Muted,
}

impl IdResource {
    async fn fetch<G: SocialGraph + ?Sized>(
        &self,
        api: &G,
        cursor: Option<i64>,
    ) -> RemoteResult<IdPage> {
        match self {
            IdResource::FollowersOf(name) => api.follower_ids(name, cursor).await,
            IdResource::FriendsOf(name) => api.friend_ids(name, cursor).await,
            IdResource::Muted => api.muted_ids(cursor).await,
        }
    }
}

impl std::fmt::Display for IdResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdResource::FollowersOf(name) => write!(f, "followers of @{}", name),
            IdResource::FriendsOf(name) => write!(f, "accounts followed by @{}", name),
            IdResource::Muted => write!(f, "muted accounts"),
        }
    }
}

/// Fetch every id of `resource`
pub async fn page_all<G: SocialGraph + ?Sized>(api: &G, resource: &IdResource) -> RemoteResult<IdSet> {
    let ids = collect(api, resource, None).await?;
    Ok(ids.into_iter().collect())
}

/// Fetch at most `limit` ids of `resource`
///
/// Stops requesting pages once `limit` ids have been seen and keeps the first
/// `limit` in the order the API returned them.
pub async fn page_bounded<G: SocialGraph + ?Sized>(
    api: &G,
    resource: &IdResource,
    limit: usize,
) -> RemoteResult<IdSet> {
    if limit == 0 {
        return Ok(IdSet::new());
    }
    let ids = collect(api, resource, Some(limit)).await?;
    Ok(ids.into_iter().take(limit).collect())
}

async fn collect<G: SocialGraph + ?Sized>(
    api: &G,
    resource: &IdResource,
    limit: Option<usize>,
) -> RemoteResult<Vec<UserId>> {
    let mut ids = Vec::new();
    let mut cursor = None;
    let mut pages = 0usize;

    loop {
        let page = resource.fetch(api, cursor).await?;
        pages += 1;
        tracing::debug!(
            "Fetched page {} of {} ({} ids, next cursor {})",
            pages,
            resource,
            page.ids.len(),
            page.next_cursor
        );

        ids.extend(page.ids);

        if page.next_cursor == 0 {
            break;
        }
        if limit.is_some_and(|limit| ids.len() >= limit) {
            break;
        }
        cursor = Some(page.next_cursor);
    }

    Ok(ids)
}
