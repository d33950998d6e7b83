use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::config::{EndpointConfig, load_endpoint};
use crate::error::{Result, TideError};
use crate::request::{Request, SOAP_ACTION};
use crate::util::{backoff, preview, retriable_status};

/// One request/response exchange with the tide service.
///
/// Implementations return the raw response envelope. A SOAP fault is a
/// successful exchange; only failures to obtain an envelope are errors.
pub trait Transport {
    fn call(&self, request: &Request) -> Result<String>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn call(&self, request: &Request) -> Result<String> {
        (**self).call(request)
    }
}

/// Blocking SOAP-over-HTTP client.
#[derive(Debug, Clone)]
pub struct SoapClient {
    url: String,
    retry_max: usize,
    sleep_max: Duration,
    http: HttpClient,
}

impl SoapClient {
    /// Creates a client from the environment and/or `.tidesoaprc`.
    ///
    /// This is equivalent to `SoapClient::new(load_endpoint(None, None)?)`.
    pub fn from_env() -> Result<Self> {
        Self::new(load_endpoint(None, None)?)
    }

    pub fn new(cfg: EndpointConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("tidesoap/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("tidesoap")),
        );
        default_headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/xml; charset=utf-8"),
        );
        default_headers.insert("SOAPAction", HeaderValue::from_static(SOAP_ACTION));

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| TideError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: cfg.url,
            retry_max: cfg.retry_max.max(1),
            sleep_max: Duration::from_secs(30),
            http,
        })
    }

    pub fn with_retry_max(mut self, retry_max: usize) -> Self {
        self.retry_max = retry_max.max(1);
        self
    }

    pub fn with_sleep_max(mut self, sleep_max: Duration) -> Self {
        self.sleep_max = sleep_max;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, envelope: String) -> Result<String> {
        let resp = self.robust_request(|| self.http.post(&self.url).body(envelope.clone()).send())?;

        let status = resp.status();
        let text = resp.text()?;

        // Faults come back as 500 with an envelope in the body.
        if status.is_success() || (status == StatusCode::INTERNAL_SERVER_ERROR && looks_like_soap(&text)) {
            if text.trim().is_empty() {
                return Err(TideError::Transport(format!(
                    "empty response body (HTTP {}) from {}",
                    status.as_u16(),
                    self.url
                )));
            }
            return Ok(text);
        }

        Err(TideError::Transport(format!(
            "HTTP {} from {}\n{}",
            status.as_u16(),
            self.url,
            preview(&text, 400)
        )))
    }

    fn robust_request<F>(&self, mut f: F) -> Result<Response>
    where
        F: FnMut() -> std::result::Result<Response, reqwest::Error>,
    {
        let mut tries = 0usize;
        let mut sleep = Duration::from_secs(1).min(self.sleep_max);
        loop {
            match f() {
                Ok(resp) => {
                    if retriable_status(resp.status().as_u16()) {
                        tries += 1;
                        if tries >= self.retry_max {
                            return Ok(resp);
                        }
                        warn!("HTTP {} from {}, retrying", resp.status().as_u16(), self.url);
                        thread::sleep(sleep);
                        sleep = backoff(sleep, self.sleep_max);
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    tries += 1;
                    if tries >= self.retry_max {
                        return Err(err.into());
                    }
                    // timeouts / transient connection errors
                    debug!("request attempt {tries} failed: {err}");
                    thread::sleep(sleep);
                    sleep = backoff(sleep, self.sleep_max);
                }
            }
        }
    }
}

impl Transport for SoapClient {
    fn call(&self, request: &Request) -> Result<String> {
        let envelope = request.to_envelope()?;
        debug!("POST {} for station {}", self.url, request.station());
        self.post(envelope)
    }
}

fn looks_like_soap(body: &str) -> bool {
    body.contains("Envelope") && body.contains("Body")
}
