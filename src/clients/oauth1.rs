//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Twitter user-context calls made with the agent owner's own consumer key
//! and access token are signed per request. Body parameters are never part
//! of the signature because every signed call sends JSON.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt;

use crate::error::{Result, SkillError};

type HmacSha1 = Hmac<Sha1>;

/// The four user-context credentials
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for OAuth1Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &self.access_token)
            .finish_non_exhaustive()
    }
}

impl OAuth1Credentials {
    /// `Authorization` header value for one request
    ///
    /// `url` is the endpoint without its query string; `query` holds the
    /// query parameters reqwest will append.
    pub fn authorization(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.sign(method, url, query, &nonce, &timestamp)
    }

    fn sign(
        &self,
        method: &str,
        url: &str,
        query: &[(&str, String)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String> {
        let oauth = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];
        let params = oauth
            .iter()
            .copied()
            .chain(query.iter().map(|(k, v)| (*k, v.as_str())));
        let base = signature_base(method, url, params);

        let key = format!(
            "{}&{}",
            encode(&self.consumer_secret),
            encode(&self.access_token_secret)
        );
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| SkillError::Internal(format!("OAuth1 signing key: {}", e)))?;
        mac.update(base.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let mut fields: Vec<String> = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, encode(v)))
            .collect();
        fields.push(format!("oauth_signature=\"{}\"", encode(&signature)));
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    /// SHA-256 over all four credentials
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            &self.consumer_key,
            &self.consumer_secret,
            &self.access_token,
            &self.access_token_secret,
        ] {
            hasher.update(part.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// RFC 3986 percent-encoding (unreserved characters kept)
fn encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

fn signature_base<'a>(
    method: &str,
    url: &str,
    params: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut pairs: Vec<(String, String)> = params
        .map(|(k, v)| (encode(k).into_owned(), encode(v).into_owned()))
        .collect();
    pairs.sort();
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}&{}&{}", method.to_ascii_uppercase(), encode(url), encode(&joined))
}
