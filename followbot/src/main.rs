//! followbot - Follow, unfollow and mute automation for a Twitter account

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use libfollowbot::bot::{default_config_path, SnapshotStatus};
use libfollowbot::sync::SyncReport;
use libfollowbot::types::{id_set, ResultType};
use libfollowbot::{Bot, FollowbotError, ReconcileReport, SearchQuery, Tweet};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "followbot")]
#[command(version)]
#[command(about = "Follow, unfollow and mute automation for a Twitter account")]
#[command(long_about = "\
followbot - Follow, unfollow and mute automation for a Twitter account

DESCRIPTION:
    followbot keeps local snapshots of who follows the account and who the
    account follows, refreshes them from Twitter, and uses them to drive bulk
    actions. Run `followbot sync` before any bulk action so the snapshots
    reflect the current state.

USAGE EXAMPLES:
    # Refresh the follower and following snapshots
    followbot sync

    # Follow everyone who follows the account
    followbot follow-back

    # Unfollow accounts that never followed back, except two
    followbot unfollow-nonfollowers --keep 12 --keep 783214

    # Follow the authors of recent tweets about Rust
    followbot follow-matching \"#rustlang\" --count 50

    # Follow up to 200 followers of another account
    followbot follow-followers-of @rustlang --limit 200

    # Machine-readable snapshot status
    followbot status --format json

CONFIGURATION:
    Configuration file: ~/.config/followbot/config.toml
    Override with --config or the FOLLOWBOT_CONFIG environment variable.

    Logging: FOLLOWBOT_LOG_FORMAT (text, json, pretty) and
    FOLLOWBOT_LOG_LEVEL (error, warn, info, debug, trace).

EXIT CODES:
    0 - Success
    1 - Operation failed (remote error, snapshot error, aborted run)
    2 - Authentication failed
    3 - Invalid input
    4 - Bot not set up (missing or invalid configuration)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "FOLLOWBOT_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Refresh the follower and following snapshots
    Sync,

    /// Show snapshot sizes and ages
    Status,

    /// Search recent tweets
    Search(SearchArgs),

    /// Follow the authors of matching tweets
    FollowMatching(SearchArgs),

    /// Follow every follower not followed yet
    FollowBack,

    /// Follow followers of another account
    FollowFollowersOf {
        /// Screen name of the account whose followers to follow
        screen_name: String,

        /// Maximum number of followers to consider
        #[arg(short, long, default_value = "100")]
        limit: usize,
    },

    /// Unfollow accounts that do not follow back
    UnfollowNonfollowers(KeepArgs),

    /// Mute every followed account
    MuteFollowing(KeepArgs),

    /// Unmute every muted account
    UnmuteAll(KeepArgs),

    /// Favorite matching tweets
    Favorite(SearchArgs),

    /// Retweet matching tweets
    Retweet(SearchArgs),
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search phrase
    query: String,

    /// Number of tweets to fetch
    #[arg(short = 'n', long, default_value_t = SearchQuery::DEFAULT_COUNT)]
    count: u32,

    /// Result type: recent, popular or mixed
    #[arg(long, default_value = "recent")]
    result_type: ResultType,
}

impl SearchArgs {
    fn to_query(&self) -> libfollowbot::Result<SearchQuery> {
        if self.query.trim().is_empty() {
            return Err(FollowbotError::InvalidInput(
                "search query cannot be empty".to_string(),
            ));
        }
        Ok(SearchQuery::new(self.query.as_str())
            .with_count(self.count)
            .with_result_type(self.result_type))
    }
}

#[derive(Args, Debug)]
struct KeepArgs {
    /// Account id to leave alone, in addition to the configured list
    #[arg(short, long = "keep", value_name = "ID")]
    keep: Vec<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    libfollowbot::logging::init_default(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<FollowbotError>()
        .map(FollowbotError::exit_code)
        .unwrap_or(1)
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    tracing::debug!("Using config file {}", config_path.display());

    let bot = Bot::setup(&config_path);
    let session = bot.session()?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Sync => {
            let report = session.sync().await.context("Sync failed")?;
            print_sync(&report, json)?;
        }
        Commands::Status => {
            let status = session.snapshot_status()?;
            print_status(&status, json)?;
        }
        Commands::Search(args) => {
            let tweets = session.search(&args.to_query()?).await?;
            print_tweets(&tweets, json)?;
        }
        Commands::FollowMatching(args) => {
            let report = session.follow_matching(&args.to_query()?).await?;
            print_report(&report, json)?;
        }
        Commands::FollowBack => {
            let report = session.follow_back().await?;
            print_report(&report, json)?;
        }
        Commands::FollowFollowersOf { screen_name, limit } => {
            let report = session.follow_followers_of(&screen_name, limit).await?;
            print_report(&report, json)?;
        }
        Commands::UnfollowNonfollowers(args) => {
            let report = session.unfollow_nonfollowers(&id_set(args.keep)).await?;
            print_report(&report, json)?;
        }
        Commands::MuteFollowing(args) => {
            let report = session.mute_following(&id_set(args.keep)).await?;
            print_report(&report, json)?;
        }
        Commands::UnmuteAll(args) => {
            let report = session.unmute_all(&id_set(args.keep)).await?;
            print_report(&report, json)?;
        }
        Commands::Favorite(args) => {
            let report = session.favorite_matching(&args.to_query()?).await?;
            print_report(&report, json)?;
        }
        Commands::Retweet(args) => {
            let report = session.retweet_matching(&args.to_query()?).await?;
            print_report(&report, json)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}

fn print_sync(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!("followers: {}", report.followers);
    println!("following: {}", report.following);
    Ok(())
}

fn print_status(status: &[SnapshotStatus], json: bool) -> Result<()> {
    if json {
        return print_json(status);
    }
    for snapshot in status {
        let marker = if snapshot.stale { " (stale)" } else { "" };
        println!(
            "{}: {} ids, updated {}s ago{} [{}]",
            snapshot.role.as_str(),
            snapshot.count,
            snapshot.age_secs,
            marker,
            snapshot.path.display()
        );
    }
    Ok(())
}

fn print_tweets(tweets: &[Tweet], json: bool) -> Result<()> {
    if json {
        return print_json(tweets);
    }
    for tweet in tweets {
        println!("{} | @{} | {}", tweet.id, tweet.user.screen_name, tweet.text);
    }
    Ok(())
}

fn print_report(report: &ReconcileReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!(
        "{} {}, {} failed, {} skipped",
        report.action.past_tense(),
        report.succeeded.len(),
        report.failed.len(),
        report.skipped
    );
    for failure in &report.failed {
        println!("  ✗ {}: {}", failure.target, failure.message);
    }
    Ok(())
}
