//! HTTP fetcher.
//!
//! One GET per call with a bounded timeout and redirect chain. Every
//! redirect hop is re-validated so a public URL cannot bounce the request
//! into the private network.

use async_trait::async_trait;
use chrono::Utc;
use encoding_rs::{Encoding, UTF_8};
use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use std::error::Error as StdError;
use tracing::{debug, warn};
use url::Url;

use crate::config::{FetchConfig, DEFAULT_ACCEPT};
use crate::error::{FetchError, FetchResult, ValidationError};
use crate::security::UrlValidator;
use crate::traits::fetcher::{Fetcher, RawPage};

/// Content types accepted as HTML.
const HTML_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// Query parameter carrying the cache-busting timestamp.
pub const CACHE_BUST_PARAM: &str = "_cb";

/// Why the redirect policy stopped a chain.
#[derive(Debug, thiserror::Error)]
enum RedirectRejection {
    #[error("too many redirects")]
    TooMany,

    #[error("redirect target rejected: {0}")]
    Blocked(ValidationError),
}

/// Fetches pages over HTTP(S).
///
/// The reqwest client is built once and reused; it is safe to share across
/// concurrent checks.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = HttpFetcher::new(FetchConfig::default())?;
/// let page = fetcher.fetch(&Url::parse("https://example.com/")?).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a fetcher that re-validates redirects with the default validator.
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        Self::with_validator(config, UrlValidator::new())
    }

    /// Create a fetcher with a custom redirect validator.
    pub fn with_validator(config: FetchConfig, validator: UrlValidator) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(redirect_policy(config.max_redirects, validator))
            .build()
            .map_err(FetchError::Http)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The URL actually requested: `url` plus `_cb=<unix ms>` when enabled.
    fn request_url(&self, url: &Url) -> Url {
        let mut request_url = url.clone();
        if self.config.cache_bust {
            request_url
                .query_pairs_mut()
                .append_pair(CACHE_BUST_PARAM, &Utc::now().timestamp_millis().to_string());
        }
        request_url
    }
}

fn redirect_policy(max_redirects: usize, validator: UrlValidator) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error(RedirectRejection::TooMany);
        }
        match validator.validate_url(attempt.url()) {
            Ok(()) => attempt.follow(),
            Err(e) => attempt.error(RedirectRejection::Blocked(e)),
        }
    })
}

fn redirect_rejection(err: &reqwest::Error) -> Option<&RedirectRejection> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(rejection) = cause.downcast_ref::<RedirectRejection>() {
            return Some(rejection);
        }
        source = cause.source();
    }
    None
}

fn classify(err: reqwest::Error, url: &Url) -> FetchError {
    let url = url.to_string();
    if err.is_timeout() {
        return FetchError::Timeout { url };
    }
    if err.is_redirect() {
        return match redirect_rejection(&err) {
            Some(RedirectRejection::Blocked(_)) => FetchError::RedirectBlocked { url },
            _ => FetchError::TooManyRedirects { url },
        };
    }
    FetchError::Http(err)
}

fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    HTML_CONTENT_TYPES.iter().any(|t| content_type.contains(t))
}

/// Read the body, failing once it grows past `limit` bytes.
async fn read_body(response: reqwest::Response, limit: usize, url: &Url) -> FetchResult<Vec<u8>> {
    let too_large = || FetchError::BodyTooLarge {
        url: url.to_string(),
        limit,
    };
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| classify(e, url))?;
        if body.len() + chunk.len() > limit {
            warn!(url = %url, limit, "Response body over limit");
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Decode with the `charset` from the content type, UTF-8 otherwise.
/// A byte-order mark takes precedence.
fn decode_body(body: &[u8], content_type: &str) -> String {
    let encoding = charset(content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

fn charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult<RawPage> {
        let request_url = self.request_url(url);
        debug!(url = %url, "HTTP fetch starting");

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                classify(e, url)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_html(&content_type) {
            return Err(FetchError::UnsupportedContentType { content_type });
        }

        let final_url = response.url().clone();
        let body = read_body(response, self.config.max_body_bytes, url).await?;
        let html = decode_body(&body, &content_type);

        debug!(
            url = %url,
            final_url = %final_url,
            status = status.as_u16(),
            bytes = html.len(),
            "HTTP fetch complete"
        );

        Ok(RawPage::new(url.clone(), html)
            .with_final_url(final_url)
            .with_status(status.as_u16())
            .with_content_type(content_type))
    }

    fn name(&self) -> &str {
        "http"
    }
}
