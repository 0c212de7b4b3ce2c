use std::time::Duration;

use futures_util::StreamExt;
use harvester_logging::harvest_debug;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use url::Url;

use crate::wire::{Envelope, ReplyListData};
use crate::{FailureKind, FetchError, ReplyPage, ReplyPageRequest};

pub const DEFAULT_API_BASE: &str = "https://api.bilibili.com";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub api_base: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 2 * 1024 * 1024,
            user_agent: concat!("harvester/", env!("CARGO_PKG_VERSION")).to_string(),
            allowed_content_types: vec!["application/json".to_string()],
        }
    }
}

/// Source of nested reply pages for one root.
#[async_trait::async_trait]
pub trait ReplyPageSource: Send + Sync {
    async fn fetch_page(&self, request: &ReplyPageRequest) -> Result<ReplyPage, FetchError>;
}

/// JSON-over-HTTP access to the comment API, shared by the reply source and
/// the main listing trigger.
#[derive(Debug, Clone)]
pub struct ApiClient {
    settings: FetchSettings,
    base: Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let base = Url::parse(&settings.api_base)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, FetchError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GET `url` and unwrap the `data` member of a `{code, message, data}` envelope.
    pub(crate) async fn get_data<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        harvest_debug!("GET {}", url);
        let bytes = self.get_bytes(url).await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FailureKind::MalformedBody, err.to_string()))?;
        if envelope.code != 0 {
            return Err(FetchError::new(
                FailureKind::UpstreamCode(envelope.code),
                envelope.message,
            ));
        }
        envelope
            .data
            .ok_or_else(|| FetchError::new(FailureKind::MalformedBody, "missing data"))
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        if let Some(ct) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

/// Reply pages served by the `x/v2/reply/reply` endpoint.
#[derive(Debug, Clone)]
pub struct ReqwestReplySource {
    api: ApiClient,
}

impl ReqwestReplySource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl ReplyPageSource for ReqwestReplySource {
    async fn fetch_page(&self, request: &ReplyPageRequest) -> Result<ReplyPage, FetchError> {
        let url = self.api.endpoint(
            "/x/v2/reply/reply",
            &[
                ("type", "1".to_string()),
                ("oid", request.context.oid.clone()),
                ("sort", "2".to_string()),
                ("ps", request.page_size.to_string()),
                ("root", request.root.to_string()),
                ("pn", request.page.to_string()),
                ("web_location", "333.788".to_string()),
            ],
        )?;
        let data: ReplyListData = self.api.get_data(url).await?;
        let total = data.page.map(|p| p.count).unwrap_or(0);
        let replies = data
            .replies
            .unwrap_or_default()
            .into_iter()
            .map(|reply| reply.into_reply(request.root))
            .collect();
        Ok(ReplyPage { replies, total })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
