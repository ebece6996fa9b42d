//! JSON API client.
//!
//! Every request carries `X-Requested-With: XMLHttpRequest`,
//! `Accept: application/json` and, once a token is set, a bearer
//! `Authorization` header. Failures are classified into [`HttpError`]
//! before they reach the caller. A 401 additionally broadcasts
//! `Unauthorized` and a 429 broadcasts `RateLimited` on the bus, exactly
//! once per response. Nothing is retried.

mod error;
mod response;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use futures_util::future::{AbortHandle, AbortRegistration, Abortable};
use reqwest::header::ACCEPT;
use reqwest::multipart::Form;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use courier_core::EventBus;
use courier_types::{ApiSettings, Event};

pub use error::HttpError;
pub use response::{Response, ResponseBody, parse_retry_after};

use error::extract_error_message;
use response::decode_body;

/// Per-request knobs.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// Extra headers, applied after the defaults.
    pub headers: Vec<(String, String)>,
    /// Overrides the client-wide timeout.
    pub timeout: Option<Duration>,
    /// Pair of an [`AbortHandle`] the caller keeps.
    pub abort: Option<AbortRegistration>,
}

impl RequestOptions {
    /// Options wired to a fresh abort handle.
    #[must_use]
    pub fn abortable() -> (Self, AbortHandle) {
        let (handle, registration) = AbortHandle::new_pair();
        (
            Self {
                abort: Some(registration),
                ..Self::default()
            },
            handle,
        )
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Request payload.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    /// The transport sets the multipart content type and boundary.
    Multipart(Form),
}

struct HttpInner {
    client: reqwest::Client,
    base_url: String,
    token: RefCell<Option<String>>,
    bus: EventBus,
}

/// Cheap-to-clone handle; clones share the token.
#[derive(Clone)]
pub struct Http {
    inner: Rc<HttpInner>,
}

impl fmt::Debug for Http {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Http")
            .field("base_url", &self.inner.base_url)
            .field("authenticated", &self.inner.token.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl Http {
    pub fn new(settings: &ApiSettings, bus: EventBus) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()?;
        Ok(Self::with_client(client, &settings.base_url, bus))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str, bus: EventBus) -> Self {
        Self {
            inner: Rc::new(HttpInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                token: RefCell::default(),
                bus,
            }),
        }
    }

    /// Set or clear the bearer token. Empty strings clear it.
    pub fn set_token(&self, token: Option<&str>) {
        let token = token.map(str::trim).filter(|token| !token.is_empty());
        *self.inner.token.borrow_mut() = token.map(str::to_string);
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner.token.borrow().clone()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Response, HttpError> {
        self.request(Method::GET, path, Body::Empty, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Response, HttpError> {
        self.request(Method::DELETE, path, Body::Empty, options).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: Value,
        options: RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::POST, path, Body::Json(body), options).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: Value,
        options: RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::PUT, path, Body::Json(body), options).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: Value,
        options: RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::PATCH, path, Body::Json(body), options).await
    }

    /// POST multipart form data.
    pub async fn upload(
        &self,
        path: &str,
        form: Form,
        options: RequestOptions,
    ) -> Result<Response, HttpError> {
        self.request(Method::POST, path, Body::Multipart(form), options).await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Body,
        options: RequestOptions,
    ) -> Result<Response, HttpError> {
        let url = self.url(path);
        let mut builder = self
            .inner
            .client
            .request(method.clone(), &url)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(ACCEPT, "application/json");
        if let Some(token) = self.inner.token.borrow().as_deref() {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(form) => builder.multipart(form),
        };

        // Once a status line arrives the answer is classified by status; a
        // body that fails to arrive reads as no body.
        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await.unwrap_or_else(|e| {
                tracing::warn!(
                    %method,
                    url = %url,
                    status = status.as_u16(),
                    "Failed to read response body: {e}"
                );
                Default::default()
            });
            Ok::<_, reqwest::Error>((status, headers, bytes))
        };
        let outcome = match options.abort {
            Some(registration) => match Abortable::new(exchange, registration).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::debug!(%method, url = %url, "Request aborted");
                    return Err(HttpError::Aborted);
                }
            },
            None => exchange.await,
        };
        let (status, headers, bytes) = outcome.map_err(|source| {
            tracing::warn!(%method, url = %url, "Request failed before a response: {source}");
            HttpError::Transport { source }
        })?;

        let body = decode_body(&headers, &bytes);
        if status.is_success() {
            tracing::debug!(%method, url = %url, status = status.as_u16(), "Request succeeded");
            return Ok(Response {
                status: status.as_u16(),
                body,
            });
        }

        let message = body
            .as_ref()
            .and_then(ResponseBody::as_json)
            .and_then(extract_error_message)
            .unwrap_or_else(|| reason_phrase(status));
        match status {
            StatusCode::UNAUTHORIZED => {
                tracing::warn!(url = %url, "Unauthorized response");
                self.inner.bus.emit(&Event::Unauthorized {
                    path: path.to_string(),
                });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(&headers);
                tracing::warn!(url = %url, ?retry_after, "Rate limited");
                self.inner.bus.emit(&Event::RateLimited {
                    path: path.to_string(),
                    retry_after,
                });
            }
            _ => {
                tracing::debug!(%method, url = %url, status = status.as_u16(), "Request rejected");
            }
        }
        Err(HttpError::Api {
            status: status.as_u16(),
            message,
            body,
        })
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), ToString::to_string)
}
