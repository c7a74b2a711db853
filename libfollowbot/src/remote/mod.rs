//! Remote social-graph API abstraction
//!
//! [`SocialGraph`] is the capability the sync and reconciliation code needs
//! from the remote service: cursor-paginated id listings, relationship and
//! mute mutations, tweet search, and favorite/retweet actions. Every call
//! fails with a [`RemoteError`] carrying the API's message.
//!
//! # Examples
//!
//! ```no_run
//! use libfollowbot::remote::{SocialGraph, twitter::TwitterClient};
//! use libfollowbot::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let client = TwitterClient::new(config.credentials.clone())?;
//!
//! let page = client.follower_ids(&config.handle, None).await?;
//! println!("{} followers on the first page", page.ids.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{IdPage, SearchQuery, Tweet, UserId};

pub mod mock;
pub mod oauth;
pub mod twitter;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[async_trait]
pub trait SocialGraph: Send + Sync {
    /// One page of the accounts following `screen_name`
    ///
    /// `cursor` is `None` for the first page; afterwards pass the previous
    /// page's `next_cursor`.
    async fn follower_ids(&self, screen_name: &str, cursor: Option<i64>) -> RemoteResult<IdPage>;

    /// One page of the accounts `screen_name` follows
    async fn friend_ids(&self, screen_name: &str, cursor: Option<i64>) -> RemoteResult<IdPage>;

    /// One page of the accounts muted by the authenticated user
    async fn muted_ids(&self, cursor: Option<i64>) -> RemoteResult<IdPage>;

    /// Follow `user_id`
    async fn follow(&self, user_id: UserId) -> RemoteResult<()>;

    /// Unfollow `user_id`
    async fn unfollow(&self, user_id: UserId) -> RemoteResult<()>;

    async fn mute(&self, user_id: UserId) -> RemoteResult<()>;

    async fn unmute(&self, user_id: UserId) -> RemoteResult<()>;

    /// Tweets matching `query`, most relevant first
    async fn search(&self, query: &SearchQuery) -> RemoteResult<Vec<Tweet>>;

    /// Favorite a tweet, returning the favorited tweet
    async fn favorite(&self, tweet_id: u64) -> RemoteResult<Tweet>;

    /// Retweet a tweet, returning the new retweet
    async fn retweet(&self, tweet_id: u64) -> RemoteResult<Tweet>;
}

#[async_trait]
impl<G: SocialGraph + ?Sized> SocialGraph for Box<G> {
    async fn follower_ids(&self, screen_name: &str, cursor: Option<i64>) -> RemoteResult<IdPage> {
        (**self).follower_ids(screen_name, cursor).await
    }

    async fn friend_ids(&self, screen_name: &str, cursor: Option<i64>) -> RemoteResult<IdPage> {
        (**self).friend_ids(screen_name, cursor).await
    }

    async fn muted_ids(&self, cursor: Option<i64>) -> RemoteResult<IdPage> {
        (**self).muted_ids(cursor).await
    }

    async fn follow(&self, user_id: UserId) -> RemoteResult<()> {
        (**self).follow(user_id).await
    }

    async fn unfollow(&self, user_id: UserId) -> RemoteResult<()> {
        (**self).unfollow(user_id).await
    }

    async fn mute(&self, user_id: UserId) -> RemoteResult<()> {
        (**self).mute(user_id).await
    }

    async fn unmute(&self, user_id: UserId) -> RemoteResult<()> {
        (**self).unmute(user_id).await
    }

    async fn search(&self, query: &SearchQuery) -> RemoteResult<Vec<Tweet>> {
        (**self).search(query).await
    }

    async fn favorite(&self, tweet_id: u64) -> RemoteResult<Tweet> {
        (**self).favorite(tweet_id).await
    }

    async fn retweet(&self, tweet_id: u64) -> RemoteResult<Tweet> {
        (**self).retweet(tweet_id).await
    }
}
