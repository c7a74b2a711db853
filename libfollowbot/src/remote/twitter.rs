//! Twitter REST API v1.1 client
//!
//! Implements [`SocialGraph`] with `reqwest`, signing every request with
//! OAuth 1.0a user credentials.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;

use crate::config::Credentials;
use crate::error::RemoteError;
use crate::remote::oauth::OAuthSigner;
use crate::remote::{RemoteResult, SocialGraph};
use crate::types::{IdPage, SearchQuery, Tweet, UserId};

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com/1.1";

/// Largest page the id endpoints will return.
const IDS_PAGE_SIZE: u32 = 5000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TwitterClient {
    http: Client,
    signer: OAuthSigner,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    statuses: Vec<Tweet>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

impl TwitterClient {
    pub fn new(credentials: Arc<Credentials>) -> RemoteResult<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root (e.g. a local stub server)
    pub fn with_base_url(credentials: Arc<Credentials>, base_url: &str) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("followbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            signer: OAuthSigner::new(credentials),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(&str, String)>,
    ) -> RemoteResult<T> {
        let url = self.endpoint(path);
        let auth = self
            .signer
            .authorization_header(method.as_str(), &url, &params)?;

        let request = if method == Method::GET {
            self.http.get(&url).query(&params)
        } else {
            self.http.request(method.clone(), &url).form(&params)
        };

        tracing::debug!("{} {}", method, url);
        let response = request
            .header(AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| RemoteError::Decode(format!("{}: {}", path, e)))
    }

    async fn ids(
        &self,
        path: &str,
        screen_name: Option<&str>,
        cursor: Option<i64>,
    ) -> RemoteResult<IdPage> {
        let mut params = vec![("count", IDS_PAGE_SIZE.to_string())];
        if let Some(name) = screen_name {
            params.push(("screen_name", name.to_string()));
        }
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        self.call(Method::GET, path, params).await
    }

    async fn user_action(
        &self,
        path: &str,
        user_id: UserId,
        extra: &[(&'static str, &str)],
    ) -> RemoteResult<()> {
        let mut params = vec![("user_id", user_id.to_string())];
        params.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        let _: IgnoredAny = self.call(Method::POST, path, params).await?;
        Ok(())
    }
}

#[async_trait]
impl SocialGraph for TwitterClient {
    async fn follower_ids(&self, screen_name: &str, cursor: Option<i64>) -> RemoteResult<IdPage> {
        self.ids("followers/ids.json", Some(screen_name), cursor).await
    }

    async fn friend_ids(&self, screen_name: &str, cursor: Option<i64>) -> RemoteResult<IdPage> {
        self.ids("friends/ids.json", Some(screen_name), cursor).await
    }

    async fn muted_ids(&self, cursor: Option<i64>) -> RemoteResult<IdPage> {
        self.ids("mutes/users/ids.json", None, cursor).await
    }

    async fn follow(&self, user_id: UserId) -> RemoteResult<()> {
        self.user_action("friendships/create.json", user_id, &[("follow", "false")])
            .await
    }

    async fn unfollow(&self, user_id: UserId) -> RemoteResult<()> {
        self.user_action("friendships/destroy.json", user_id, &[]).await
    }

    async fn mute(&self, user_id: UserId) -> RemoteResult<()> {
        self.user_action("mutes/users/create.json", user_id, &[]).await
    }

    async fn unmute(&self, user_id: UserId) -> RemoteResult<()> {
        self.user_action("mutes/users/destroy.json", user_id, &[]).await
    }

    async fn search(&self, query: &SearchQuery) -> RemoteResult<Vec<Tweet>> {
        let params = vec![
            ("q", query.q.clone()),
            ("count", query.count.to_string()),
            ("result_type", query.result_type.as_str().to_string()),
        ];
        let response: SearchResponse = self.call(Method::GET, "search/tweets.json", params).await?;
        Ok(response.statuses)
    }

    async fn favorite(&self, tweet_id: u64) -> RemoteResult<Tweet> {
        self.call(
            Method::POST,
            "favorites/create.json",
            vec![("id", tweet_id.to_string())],
        )
        .await
    }

    async fn retweet(&self, tweet_id: u64) -> RemoteResult<Tweet> {
        let path = format!("statuses/retweet/{}.json", tweet_id);
        self.call(Method::POST, &path, Vec::new()).await
    }
}

/// Extract a readable message from an error response body.
///
/// Joins the `errors[].message` entries when present, falls back to the
/// `error` field, and finally to the raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .iter()
            .map(|e| match e.code {
                Some(code) => format!("{} (code {})", e.message, code),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Ok(ErrorResponse {
            error: Some(error), ..
        }) => error,
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn credentials() -> Arc<Credentials> {
        Arc::new(Credentials {
            consumer_key: SecretString::from("ck".to_string()),
            consumer_secret: SecretString::from("cs".to_string()),
            oauth_token: SecretString::from("ot".to_string()),
            oauth_secret: SecretString::from("os".to_string()),
        })
    }

    #[test]
    fn test_error_message_from_errors_array() {
        let body = r#"{"errors":[{"code":162,"message":"You have been blocked from following this account at the request of the user."}]}"#;
        assert_eq!(
            api_error_message(body),
            "You have been blocked from following this account at the request of the user. (code 162)"
        );
    }

    #[test]
    fn test_error_message_joins_multiple_errors() {
        let body = r#"{"errors":[{"message":"first"},{"code":2,"message":"second"}]}"#;
        assert_eq!(api_error_message(body), "first; second (code 2)");
    }

    #[test]
    fn test_error_message_from_error_field() {
        assert_eq!(api_error_message(r#"{"error":"Not authorized."}"#), "Not authorized.");
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(api_error_message("  Over capacity \n"), "Over capacity");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = TwitterClient::with_base_url(credentials(), "http://localhost:9999/1.1/").unwrap();
        assert_eq!(
            client.endpoint("followers/ids.json"),
            "http://localhost:9999/1.1/followers/ids.json"
        );
    }

    #[test]
    fn test_search_response_shape() {
        let body = r#"{"statuses":[{"id":10,"text":"rust!","user":{"id":7,"screen_name":"ferris","name":"Ferris"}}],"search_metadata":{}}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.statuses.len(), 1);
        assert_eq!(parsed.statuses[0].user.id, UserId(7));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = TwitterClient::with_base_url(credentials(), "http://127.0.0.1:1").unwrap();
        let err = client.muted_ids(None).await.unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }
}
