//! OAuth 1.0a request signing (HMAC-SHA1)

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::ExposeSecret;
use sha1::Sha1;

use crate::config::Credentials;
use crate::error::RemoteError;

type HmacSha1 = Hmac<Sha1>;

const NONCE_LEN: usize = 32;

/// Signs API requests with the account's consumer and access credentials.
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    credentials: Arc<Credentials>,
}

impl OAuthSigner {
    pub fn new(credentials: Arc<Credentials>) -> Self {
        Self { credentials }
    }

    /// Build the `Authorization` header for a request.
    ///
    /// `params` are the query-string and form-body parameters of the request,
    /// unencoded.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, RemoteError> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_with(method, url, params, &nonce, timestamp)
    }

    /// Same as [`authorization_header`](Self::authorization_header) with a
    /// fixed nonce and timestamp.
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, String)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, RemoteError> {
        let mut oauth_params = vec![
            (
                "oauth_consumer_key",
                self.credentials.consumer_key.expose_secret().to_string(),
            ),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            (
                "oauth_token",
                self.credentials.oauth_token.expose_secret().to_string(),
            ),
            ("oauth_version", "1.0".to_string()),
        ];

        let mut all_params: Vec<(&str, String)> = params.to_vec();
        all_params.extend(oauth_params.iter().cloned());

        let signature = self.sign(method, url, &all_params)?;
        oauth_params.push(("oauth_signature", signature));
        oauth_params.sort_by(|a, b| a.0.cmp(b.0));

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    /// Compute the base64 HMAC-SHA1 signature over the signature base string.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, RemoteError> {
        let base = signature_base_string(method, url, params);
        let key = format!(
            "{}&{}",
            encode(self.credentials.consumer_secret.expose_secret()),
            encode(self.credentials.oauth_secret.expose_secret())
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| RemoteError::Network(format!("Failed to sign request: {}", e)))?;
        mac.update(base.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// `METHOD&url&params`, each part percent-encoded, params sorted.
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&param_string)
    )
}

/// RFC 3986 percent-encoding (everything but `A-Z a-z 0-9 - . _ ~`).
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    // Published example from the Twitter developer documentation.
    fn documented_signer() -> OAuthSigner {
        OAuthSigner::new(Arc::new(Credentials {
            consumer_key: SecretString::from("xvz1evFS4wEEPTGEFPHBog".to_string()),
            consumer_secret: SecretString::from(
                "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            ),
            oauth_token: SecretString::from(
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            ),
            oauth_secret: SecretString::from(
                "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
            ),
        }))
    }

    fn documented_params() -> Vec<(&'static str, String)> {
        vec![
            (
                "status",
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
            ("include_entities", "true".to_string()),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog".to_string()),
            (
                "oauth_nonce",
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".to_string(),
            ),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_timestamp", "1318622958".to_string()),
            (
                "oauth_token",
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            ),
            ("oauth_version", "1.0".to_string()),
        ]
    }

    const UPDATE_URL: &str = "https://api.twitter.com/1.1/statuses/update.json";

    #[test]
    fn test_signature_base_string_matches_documentation() {
        let base = signature_base_string("post", UPDATE_URL, &documented_params());
        assert!(base.starts_with(
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key"
        ));
        assert!(base.ends_with(
            "status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"
        ));
    }

    #[test]
    fn test_signature_matches_documentation() {
        let signature = documented_signer()
            .sign("POST", UPDATE_URL, &documented_params())
            .unwrap();
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_authorization_header_with_fixed_nonce() {
        let params = vec![
            (
                "status",
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
            ("include_entities", "true".to_string()),
        ];
        let header = documented_signer()
            .authorization_header_with(
                "POST",
                UPDATE_URL,
                &params,
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
                1318622958,
            )
            .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(!header.contains("status="));
    }

    #[test]
    fn test_random_nonce_changes_header() {
        let signer = documented_signer();
        let a = signer.authorization_header("GET", UPDATE_URL, &[]).unwrap();
        let b = signer.authorization_header("GET", UPDATE_URL, &[]).unwrap();
        assert_ne!(a, b);
    }
}
