//! In-memory social graph for testing
//!
//! [`MockGraph`] keeps follower, friend and mute lists per account, serves
//! them in cursor-paginated chunks, applies follow/unfollow/mute/unmute to
//! the owner's lists, and records every call. Individual calls can be
//! scripted to fail, and listings can be replaced with explicit pages to
//! exercise unusual cursor sequences.
//!
//! Compiled into every build so integration tests can use it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::remote::{RemoteResult, SocialGraph};
use crate::types::{IdPage, SearchQuery, Tweet, TweetAuthor, UserId};

/// Default screen name of the account the mock acts as
pub const MOCK_OWNER: &str = "followbot";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Listing {
    Followers(String),
    Friends(String),
    Muted,
}

/// Kinds of per-item mutation that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockAction {
    Follow,
    Unfollow,
    Mute,
    Unmute,
    Favorite,
    Retweet,
}

/// A recorded call against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    FollowerIds { screen_name: String, cursor: Option<i64> },
    FriendIds { screen_name: String, cursor: Option<i64> },
    MutedIds { cursor: Option<i64> },
    Follow(UserId),
    Unfollow(UserId),
    Mute(UserId),
    Unmute(UserId),
    Search(String),
    Favorite(u64),
    Retweet(u64),
}

#[derive(Debug)]
struct MockState {
    owner: String,
    page_size: usize,
    lists: HashMap<Listing, Vec<UserId>>,
    scripted_pages: HashMap<Listing, Vec<IdPage>>,
    listing_errors: HashMap<Listing, RemoteError>,
    failures: HashMap<(MockAction, u64), RemoteError>,
    search_results: Vec<Tweet>,
    calls: Vec<MockCall>,
}

/// Cloning shares the underlying state, so a test can keep a handle for
/// assertions after moving the graph into a bot.
#[derive(Debug, Clone)]
pub struct MockGraph {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockGraph {
    fn default() -> Self {
        Self::new(MOCK_OWNER)
    }
}

impl MockGraph {
    pub fn new(owner: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                owner: owner.to_string(),
                page_size: 5000,
                lists: HashMap::new(),
                scripted_pages: HashMap::new(),
                listing_errors: HashMap::new(),
                failures: HashMap::new(),
                search_results: Vec::new(),
                calls: Vec::new(),
            })),
        }
    }

    pub fn owner(&self) -> String {
        self.state.lock().unwrap().owner.clone()
    }

    /// Serve generated listings in chunks of `page_size`
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().unwrap().page_size = page_size.max(1);
        self
    }

    pub fn with_followers<I: IntoIterator<Item = u64>>(self, screen_name: &str, ids: I) -> Self {
        self.set_list(Listing::Followers(screen_name.to_string()), ids);
        self
    }

    pub fn with_friends<I: IntoIterator<Item = u64>>(self, screen_name: &str, ids: I) -> Self {
        self.set_list(Listing::Friends(screen_name.to_string()), ids);
        self
    }

    pub fn with_muted<I: IntoIterator<Item = u64>>(self, ids: I) -> Self {
        self.set_list(Listing::Muted, ids);
        self
    }

    /// Serve `listing` from these exact pages instead of generated chunks
    ///
    /// The first page answers the cursor-less request; each following page
    /// answers the previous page's `next_cursor`.
    pub fn with_pages(self, listing: Listing, pages: Vec<IdPage>) -> Self {
        self.state.lock().unwrap().scripted_pages.insert(listing, pages);
        self
    }

    /// Fail every request for `listing`
    pub fn fail_listing(self, listing: Listing, error: RemoteError) -> Self {
        self.state.lock().unwrap().listing_errors.insert(listing, error);
        self
    }

    /// Fail `action` on the user or tweet with id `target`
    pub fn fail_on(self, action: MockAction, target: u64, message: &str) -> Self {
        self.state.lock().unwrap().failures.insert(
            (action, target),
            RemoteError::Api {
                status: 403,
                message: message.to_string(),
            },
        );
        self
    }

    pub fn with_search_results(self, tweets: Vec<Tweet>) -> Self {
        self.state.lock().unwrap().search_results = tweets;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Ids passed to `action`, in call order (failed calls included)
    pub fn targets(&self, action: MockAction) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match (action, call) {
                (MockAction::Follow, MockCall::Follow(id)) => Some(id.0),
                (MockAction::Unfollow, MockCall::Unfollow(id)) => Some(id.0),
                (MockAction::Mute, MockCall::Mute(id)) => Some(id.0),
                (MockAction::Unmute, MockCall::Unmute(id)) => Some(id.0),
                (MockAction::Favorite, MockCall::Favorite(id)) => Some(id),
                (MockAction::Retweet, MockCall::Retweet(id)) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Current contents of a generated listing
    pub fn list(&self, listing: &Listing) -> Vec<UserId> {
        self.state
            .lock()
            .unwrap()
            .lists
            .get(listing)
            .cloned()
            .unwrap_or_default()
    }

    fn set_list<I: IntoIterator<Item = u64>>(&self, listing: Listing, ids: I) {
        self.state
            .lock()
            .unwrap()
            .lists
            .insert(listing, ids.into_iter().map(UserId).collect());
    }

    fn page(&self, listing: Listing, cursor: Option<i64>, call: MockCall) -> RemoteResult<IdPage> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);

        if let Some(error) = state.listing_errors.get(&listing) {
            return Err(error.clone());
        }

        if let Some(pages) = state.scripted_pages.get(&listing) {
            let index = match cursor {
                None => Some(0),
                Some(c) => pages.iter().position(|p| p.next_cursor == c).map(|i| i + 1),
            };
            return index
                .and_then(|i| pages.get(i))
                .cloned()
                .ok_or_else(|| invalid_cursor(cursor));
        }

        let ids = state.lists.get(&listing).cloned().unwrap_or_default();
        let offset = match cursor {
            None => 0,
            Some(c) if c > 0 && (c as usize) <= ids.len() => c as usize,
            Some(_) => return Err(invalid_cursor(cursor)),
        };
        let end = (offset + state.page_size).min(ids.len());
        let next_cursor = if end < ids.len() { end as i64 } else { 0 };

        Ok(IdPage {
            ids: ids[offset..end].to_vec(),
            next_cursor,
        })
    }

    fn mutate(&self, action: MockAction, user_id: UserId, call: MockCall) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);

        if let Some(error) = state.failures.get(&(action, user_id.0)) {
            return Err(error.clone());
        }

        let listing = match action {
            MockAction::Follow | MockAction::Unfollow => Listing::Friends(state.owner.clone()),
            _ => Listing::Muted,
        };
        let list = state.lists.entry(listing).or_default();
        match action {
            MockAction::Follow | MockAction::Mute => {
                if !list.contains(&user_id) {
                    list.push(user_id);
                }
            }
            _ => list.retain(|id| *id != user_id),
        }
        Ok(())
    }

    fn engage(&self, action: MockAction, tweet_id: u64, call: MockCall) -> RemoteResult<Tweet> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);

        if let Some(error) = state.failures.get(&(action, tweet_id)) {
            return Err(error.clone());
        }

        state
            .search_results
            .iter()
            .find(|t| t.id == tweet_id)
            .cloned()
            .ok_or_else(|| RemoteError::Api {
                status: 404,
                message: "No status found with that ID.".to_string(),
            })
    }
}

fn invalid_cursor(cursor: Option<i64>) -> RemoteError {
    RemoteError::Api {
        status: 400,
        message: format!("Invalid cursor: {:?}", cursor),
    }
}

/// Build a tweet for search-result fixtures
pub fn tweet(id: u64, author_id: u64, screen_name: &str) -> Tweet {
    Tweet {
        id,
        text: format!("tweet {} by {}", id, screen_name),
        user: TweetAuthor {
            id: UserId(author_id),
            screen_name: screen_name.to_string(),
        },
    }
}

#[async_trait]
impl SocialGraph for MockGraph {
    async fn follower_ids(&self, screen_name: &str, cursor: Option<i64>) -> RemoteResult<IdPage> {
        self.page(
            Listing::Followers(screen_name.to_string()),
            cursor,
            MockCall::FollowerIds {
                screen_name: screen_name.to_string(),
                cursor,
            },
        )
    }

    async fn friend_ids(&self, screen_name: &str, cursor: Option<i64>) -> RemoteResult<IdPage> {
        self.page(
            Listing::Friends(screen_name.to_string()),
            cursor,
            MockCall::FriendIds {
                screen_name: screen_name.to_string(),
                cursor,
            },
        )
    }

    async fn muted_ids(&self, cursor: Option<i64>) -> RemoteResult<IdPage> {
        self.page(Listing::Muted, cursor, MockCall::MutedIds { cursor })
    }

    async fn follow(&self, user_id: UserId) -> RemoteResult<()> {
        self.mutate(MockAction::Follow, user_id, MockCall::Follow(user_id))
    }

    async fn unfollow(&self, user_id: UserId) -> RemoteResult<()> {
        self.mutate(MockAction::Unfollow, user_id, MockCall::Unfollow(user_id))
    }

    async fn mute(&self, user_id: UserId) -> RemoteResult<()> {
        self.mutate(MockAction::Mute, user_id, MockCall::Mute(user_id))
    }

    async fn unmute(&self, user_id: UserId) -> RemoteResult<()> {
        self.mutate(MockAction::Unmute, user_id, MockCall::Unmute(user_id))
    }

    async fn search(&self, query: &SearchQuery) -> RemoteResult<Vec<Tweet>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Search(query.q.clone()));
        Ok(state
            .search_results
            .iter()
            .take(query.count as usize)
            .cloned()
            .collect())
    }

    async fn favorite(&self, tweet_id: u64) -> RemoteResult<Tweet> {
        self.engage(MockAction::Favorite, tweet_id, MockCall::Favorite(tweet_id))
    }

    async fn retweet(&self, tweet_id: u64) -> RemoteResult<Tweet> {
        self.engage(MockAction::Retweet, tweet_id, MockCall::Retweet(tweet_id))
    }
}
