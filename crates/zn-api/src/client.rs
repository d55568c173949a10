// Async HTTP client for the Zero Networks REST API.
//
// Base path: /api/v1/
// Auth: raw API token in the `Authorization` header (no scheme prefix)

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::query::Query;
use crate::retry::RetryPolicy;
use crate::token;
use crate::transport::TransportConfig;

/// Portal host used when neither an override nor the token names one.
pub const DEFAULT_PORTAL_HOST: &str = "portal.zeronetworks.com";

const API_PATH: &str = "api/v1";

/// Async client for the Zero Networks API.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug, Clone)]
pub struct ZnClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ZnClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key.
    ///
    /// The key is sent verbatim as the `Authorization` header on every
    /// request. The host comes from `base_url` when given, otherwise from
    /// the token's `aud` claim, otherwise [`DEFAULT_PORTAL_HOST`].
    pub fn from_api_key(
        api_key: &SecretString,
        base_url: Option<&str>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let raw = api_key.expose_secret().trim();
        if raw.is_empty() {
            return Err(Error::InvalidApiKey("API key cannot be empty".into()));
        }

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(raw)
            .map_err(|e| Error::InvalidApiKey(format!("invalid header value: {e}")))?;
        key_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, key_value);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = transport.build_client_with_headers(headers)?;
        let base_url = normalize_base_url(&resolve_base_url(base_url, raw))?;
        debug!(%base_url, "zero networks client ready");

        Ok(Self {
            http,
            base_url,
            retry: transport.retry,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The resolved API root, always ending in `/api/v1/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Relative path from raw segments. Each segment is percent-encoded on
    /// its own, so an id holding `/`, `?` or `#` stays one segment.
    pub(crate) fn segment_path(&self, segments: &[&str]) -> Result<String, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        let root = self.base_url.path();
        Ok(url.path().strip_prefix(root).unwrap_or(url.path()).to_owned())
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::GET, path, &Query::new(), None).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
    ) -> Result<T, Error> {
        self.request(Method::GET, path, query, None).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let body = serde_json::to_vec(body)?;
        self.request(Method::POST, path, &Query::new(), Some(body))
            .await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let body = serde_json::to_vec(body)?;
        self.request(Method::PUT, path, &Query::new(), Some(body))
            .await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::DELETE, path, &Query::new(), None)
            .await
    }

    pub(crate) async fn delete_with_body<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let body = serde_json::to_vec(body)?;
        self.request(Method::DELETE, path, &Query::new(), Some(body))
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<Vec<u8>>,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        if query.is_empty() {
            debug!("{method} {url}");
        } else {
            debug!("{method} {url} params={:?}", query.pairs());
        }

        // Writes go out once: a timed-out write may already have been applied.
        let policy = if method == Method::GET {
            self.retry
        } else {
            RetryPolicy::none()
        };
        policy
            .run(|| {
                let mut req = self
                    .http
                    .request(method.clone(), url.clone())
                    .query(query.pairs());
                if let Some(bytes) = &body {
                    req = req
                        .header(CONTENT_TYPE, "application/json")
                        .body(bytes.clone());
                }
                async move {
                    let resp = req.send().await?;
                    Self::handle_response(resp).await
                }
            })
            .await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::from_status(status.as_u16(), body));
        }

        // Mutations often answer 200/204 with nothing at all.
        let text = if body.trim().is_empty() {
            "null"
        } else {
            body.as_str()
        };
        serde_json::from_str(text).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// Pick the host for a client: explicit override, then the token's `aud`
/// claim, then the public portal.
pub fn resolve_base_url(override_url: Option<&str>, api_key: &str) -> String {
    if let Some(url) = override_url.map(str::trim).filter(|u| !u.is_empty()) {
        return url.to_owned();
    }
    match token::base_url_from_token(api_key) {
        Ok(aud) => aud,
        Err(e) => {
            debug!("using default portal host: {e}");
            DEFAULT_PORTAL_HOST.to_owned()
        }
    }
}

/// Turn a host or URL into the API root: add `https://` when no scheme is
/// present and make sure the path ends in `/api/v1/`.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_owned()
    } else {
        format!("https://{raw}")
    };
    let mut url = Url::parse(&with_scheme)?;
    url.set_query(None);
    url.set_fragment(None);

    let path = url.path().trim_end_matches('/').to_owned();
    if path.ends_with(API_PATH) {
        url.set_path(&format!("{path}/"));
    } else {
        url.set_path(&format!("{path}/{API_PATH}/"));
    }
    Ok(url)
}
