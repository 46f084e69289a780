use std::time::Duration;

use parking_lot::Mutex;

use crate::{Error, Result};

/// Requests that take longer than this fail with [`Error::Transport`]
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Vec<u8>>,
    pub proxy: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs a single HTTP round trip.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: HttpRequest) -> Result<RawResponse>;
}

/// The [`Transport`] used outside of tests, backed by `reqwest`.
pub struct HttpTransport {
    timeout: Duration,
    // rebuilt when the configured proxy changes
    agent: Mutex<Option<(Option<String>, reqwest::Client)>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails requests that take longer than `timeout` with [`Error::Transport`]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            agent: Mutex::new(None),
        }
    }

    fn agent(&self, proxy: Option<&str>) -> Result<reqwest::Client> {
        let mut agent = self.agent.lock();
        if let Some((current, client)) = &*agent {
            if current.as_deref() == proxy {
                return Ok(client.clone());
            }
        }

        let builder = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(self.timeout);

        let builder = match proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::https(proxy)
                    .map_err(|err| Error::Settings(format!("invalid https_proxy: {err}")))?;
                builder.proxy(proxy)
            }
            // a system wide HTTPS_PROXY reaches us through the settings
            None => builder.no_proxy(),
        };

        let client = builder.build().map_err(Error::transport)?;
        *agent = Some((proxy.map(ToString::to_string), client.clone()));
        Ok(client)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: HttpRequest) -> Result<RawResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            proxy,
        } = req;

        let agent = self.agent(proxy.as_deref())?;
        let req = headers
            .iter()
            .fold(agent.request(method.into(), &url), |req, (k, v)| {
                req.header(*k, v)
            });
        let req = match body {
            Some(body) => req.body(body),
            None => req,
        };

        let resp = req.send().await.map_err(Error::transport)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(Error::transport)?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}
