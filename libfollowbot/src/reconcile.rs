//! Set reconciliation and bulk remote actions
//!
//! Every bulk operation follows the same shape: read the snapshots it needs,
//! compute a plain set difference, then apply one remote mutation per
//! element of the result, strictly one at a time.
//!
//! Failures are handled per item. A failed mutation is logged, recorded in
//! the [`ReconcileReport`] and the loop moves on to the next target. The one
//! exception is [`Reconciler::follow_matching`]: an error that is not a
//! "blocked" or "already done" response stops the whole run and returns
//! [`FollowbotError::Aborted`]; the targets after it are never attempted.

use serde::Serialize;

use crate::error::{FollowbotError, RemoteError, Result};
use crate::pager::{page_all, page_bounded, IdResource};
use crate::remote::{RemoteResult, SocialGraph};
use crate::store::SnapshotStore;
use crate::types::{IdSet, Role, SearchQuery, Tweet, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Follow,
    Unfollow,
    Mute,
    Unmute,
    Favorite,
    Retweet,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Follow => "follow",
            Action::Unfollow => "unfollow",
            Action::Mute => "mute",
            Action::Unmute => "unmute",
            Action::Favorite => "favorite",
            Action::Retweet => "retweet",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Action::Follow => "followed",
            Action::Unfollow => "unfollowed",
            Action::Mute => "muted",
            Action::Unmute => "unmuted",
            Action::Favorite => "favorited",
            Action::Retweet => "retweeted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub target: u64,
    pub message: String,
}

/// Outcome of one bulk operation
///
/// Targets are account ids, except for favorite and retweet where they are
/// tweet ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub action: Action,
    pub succeeded: Vec<u64>,
    pub failed: Vec<Failure>,
    /// Candidates passed over without a remote call, or already applied
    pub skipped: usize,
}

impl ReconcileReport {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: 0,
        }
    }

    fn record_failure(&mut self, target: u64, error: &RemoteError) {
        self.failed.push(Failure {
            target,
            message: error.to_string(),
        });
    }
}

// Pure set differences.

/// Followers we do not follow yet
pub fn follow_back_targets(followers: &IdSet, following: &IdSet) -> IdSet {
    difference(followers, following)
}

/// Accounts we follow that do not follow us back
pub fn nonfollowers(following: &IdSet, followers: &IdSet) -> IdSet {
    difference(following, followers)
}

/// Candidates we neither follow nor have followed before
pub fn new_follow_targets(candidates: &IdSet, following: &IdSet, already_followed: &IdSet) -> IdSet {
    candidates
        .iter()
        .filter(|id| !following.contains(id) && !already_followed.contains(id))
        .copied()
        .collect()
}

/// Followed accounts not yet muted, minus the keep set
pub fn mute_targets(following: &IdSet, muted: &IdSet, keep: &IdSet) -> IdSet {
    following
        .iter()
        .filter(|id| !muted.contains(id) && !keep.contains(id))
        .copied()
        .collect()
}

/// Everything in `set` that is not in `keep`
pub fn without(set: &IdSet, keep: &IdSet) -> IdSet {
    difference(set, keep)
}

fn difference(a: &IdSet, b: &IdSet) -> IdSet {
    a.difference(b).copied().collect()
}

/// Bulk actions that target accounts rather than tweets
#[derive(Debug, Clone, Copy)]
enum UserAction {
    Follow,
    Unfollow,
    Mute,
    Unmute,
}

impl UserAction {
    fn action(self) -> Action {
        match self {
            UserAction::Follow => Action::Follow,
            UserAction::Unfollow => Action::Unfollow,
            UserAction::Mute => Action::Mute,
            UserAction::Unmute => Action::Unmute,
        }
    }
}

pub struct Reconciler<'a, G: SocialGraph + ?Sized> {
    api: &'a G,
    store: &'a SnapshotStore,
    handle: &'a str,
}

impl<'a, G: SocialGraph + ?Sized> Reconciler<'a, G> {
    pub fn new(api: &'a G, store: &'a SnapshotStore, handle: &'a str) -> Self {
        Self { api, store, handle }
    }

    /// Search tweets
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Tweet>> {
        Ok(self.api.search(query).await?)
    }

    /// Follow the authors of tweets matching `query`
    ///
    /// Skips our own tweets, authors we already follow and authors in the
    /// already-followed ledger. Aborts on the first error that is not a
    /// block or duplicate response.
    pub async fn follow_matching(&self, query: &SearchQuery) -> Result<ReconcileReport> {
        let tweets = self.api.search(query).await?;
        // Also holds authors already tried this run, so each is attempted once.
        let mut following = self.store.load(Role::Following)?;
        let do_not_follow = self.store.load(Role::AlreadyFollowed)?;
        let mut report = ReconcileReport::new(Action::Follow);

        for tweet in &tweets {
            let author = tweet.user.id;
            if tweet.is_authored_by(self.handle)
                || following.contains(&author)
                || do_not_follow.contains(&author)
            {
                report.skipped += 1;
                continue;
            }

            match self.api.follow(author).await {
                Ok(()) => {
                    tracing::info!("Followed @{} ({})", tweet.user.screen_name, author);
                    following.insert(author);
                    report.succeeded.push(author.0);
                }
                Err(e) if e.is_blocked() || e.is_duplicate() => {
                    tracing::warn!("Could not follow @{}: {}", tweet.user.screen_name, e);
                    following.insert(author);
                    report.record_failure(author.0, &e);
                }
                Err(e) => {
                    tracing::error!(
                        "Aborting follow run at @{} after {} follow(s): {}",
                        tweet.user.screen_name,
                        report.succeeded.len(),
                        e
                    );
                    return Err(FollowbotError::Aborted {
                        completed: report.succeeded.len(),
                        source: e,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Follow every follower we do not follow yet
    pub async fn follow_back(&self) -> Result<ReconcileReport> {
        let followers = self.store.load(Role::Followers)?;
        let following = self.store.load(Role::Following)?;
        let targets = follow_back_targets(&followers, &following);
        Ok(self.apply(UserAction::Follow, &targets).await)
    }

    /// Follow up to `limit` followers of `screen_name`
    ///
    /// Accounts already followed, or unfollowed before, are left alone.
    pub async fn follow_followers_of(
        &self,
        screen_name: &str,
        limit: usize,
    ) -> Result<ReconcileReport> {
        let resource = IdResource::FollowersOf(screen_name.trim_start_matches('@').to_string());
        let candidates = page_bounded(self.api, &resource, limit).await?;
        let following = self.store.load(Role::Following)?;
        let already_followed = self.store.load(Role::AlreadyFollowed)?;

        let targets = new_follow_targets(&candidates, &following, &already_followed);
        let mut report = self.apply(UserAction::Follow, &targets).await;
        report.skipped += candidates.len() - targets.len();
        Ok(report)
    }

    /// Unfollow everyone who does not follow us back, except `keep`
    ///
    /// Every nonfollower, kept or not, is merged into the already-followed
    /// ledger before the first unfollow is sent.
    pub async fn unfollow_nonfollowers(&self, keep: &IdSet) -> Result<ReconcileReport> {
        let following = self.store.load(Role::Following)?;
        let followers = self.store.load(Role::Followers)?;
        let not_following_back = nonfollowers(&following, &followers);

        self.store
            .append_merge(Role::AlreadyFollowed, &not_following_back)?;

        let targets = without(&not_following_back, keep);
        let mut report = self.apply(UserAction::Unfollow, &targets).await;
        report.skipped += not_following_back.len() - targets.len();
        Ok(report)
    }

    /// Mute every account we follow, except `keep`
    pub async fn mute_following(&self, keep: &IdSet) -> Result<ReconcileReport> {
        let following = self.store.load(Role::Following)?;
        let muted = page_all(self.api, &IdResource::Muted).await?;
        let targets = mute_targets(&following, &muted, keep);
        Ok(self.apply(UserAction::Mute, &targets).await)
    }

    /// Unmute every muted account, except `keep`
    pub async fn unmute_all(&self, keep: &IdSet) -> Result<ReconcileReport> {
        let muted = page_all(self.api, &IdResource::Muted).await?;
        let targets = without(&muted, keep);
        let mut report = self.apply(UserAction::Unmute, &targets).await;
        report.skipped += muted.len() - targets.len();
        Ok(report)
    }

    /// Favorite tweets matching `query`, skipping our own
    pub async fn favorite_matching(&self, query: &SearchQuery) -> Result<ReconcileReport> {
        let tweets = self.api.search(query).await?;
        let mut report = ReconcileReport::new(Action::Favorite);

        for tweet in &tweets {
            if tweet.is_authored_by(self.handle) {
                report.skipped += 1;
                continue;
            }

            match self.api.favorite(tweet.id).await {
                Ok(favorited) => {
                    tracing::info!("Favorited: {}", favorited.text);
                    report.succeeded.push(tweet.id);
                }
                Err(e) if e.is_duplicate() => {
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("Could not favorite {}: {}", tweet.id, e);
                    report.record_failure(tweet.id, &e);
                }
            }
        }

        Ok(report)
    }

    /// Retweet tweets matching `query`, skipping our own
    pub async fn retweet_matching(&self, query: &SearchQuery) -> Result<ReconcileReport> {
        let tweets = self.api.search(query).await?;
        let mut report = ReconcileReport::new(Action::Retweet);

        for tweet in &tweets {
            if tweet.is_authored_by(self.handle) {
                report.skipped += 1;
                continue;
            }

            match self.api.retweet(tweet.id).await {
                Ok(retweeted) => {
                    tracing::info!("Retweeted: {}", retweeted.text);
                    report.succeeded.push(tweet.id);
                }
                Err(e) if e.is_duplicate() => {
                    tracing::debug!("Already retweeted {}: {}", tweet.id, e);
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("Could not retweet {}: {}", tweet.id, e);
                    report.record_failure(tweet.id, &e);
                }
            }
        }

        Ok(report)
    }

    /// Apply `user_action` to each target, continuing past failures
    async fn apply(&self, user_action: UserAction, targets: &IdSet) -> ReconcileReport {
        let action = user_action.action();
        let mut report = ReconcileReport::new(action);
        if targets.is_empty() {
            tracing::info!("Nothing to {}", action.as_str());
            return report;
        }

        tracing::info!("Applying {} to {} account(s)", action.as_str(), targets.len());
        for &user_id in targets {
            match self.mutate(user_action, user_id).await {
                Ok(()) => {
                    tracing::info!("{} {}", action.past_tense(), user_id);
                    report.succeeded.push(user_id.0);
                }
                Err(e) => {
                    tracing::warn!("Failed to {} {}: {}", action.as_str(), user_id, e);
                    report.record_failure(user_id.0, &e);
                }
            }
        }
        report
    }

    /// One remote call against an account
    async fn mutate(&self, action: UserAction, user_id: UserId) -> RemoteResult<()> {
        match action {
            UserAction::Follow => self.api.follow(user_id).await,
            UserAction::Unfollow => self.api.unfollow(user_id).await,
            UserAction::Mute => self.api.mute(user_id).await,
            UserAction::Unmute => self.api.unmute(user_id).await,
        }
    }
}
