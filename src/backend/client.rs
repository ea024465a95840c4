//! HTTP client for the queue backend.

use crate::backend::types::{
    DingSoundResponse, SpeechPayload, TtsRequest, Video, VideosResponse, WindowState,
    WindowsResponse,
};
use crate::config::ServerConfig;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;

/// Trait for the backend endpoints the monitor consumes.
///
/// This trait allows swapping implementations (real HTTP vs mock).
#[async_trait]
pub trait MonitorBackend: Send + Sync {
    /// `GET /queue/public/windows`
    async fn fetch_windows(&self) -> Result<Vec<WindowState>>;

    /// `GET /videos`
    async fn fetch_videos(&self) -> Result<Vec<Video>>;

    /// `GET /admin/settings/ding-sound`
    async fn fetch_ding_sound_url(&self) -> Result<Option<String>>;

    /// `POST /tts`
    async fn synthesize_speech(&self, text: &str) -> Result<SpeechPayload>;

    /// Download an asset (chime sound) by absolute or server-relative URL.
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>>;
}

/// Backend reached over HTTP with `reqwest`.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    asset_base: Url,
    token: Option<String>,
}

impl HttpBackend {
    /// Build a client with the configured timeout.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let asset_base = asset_base(&base_url)?;

        Ok(Self {
            client,
            base_url,
            asset_base,
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let response = self.send(self.client.get(&url), &url).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl MonitorBackend for HttpBackend {
    async fn fetch_windows(&self) -> Result<Vec<WindowState>> {
        let response: WindowsResponse = self.get_json("queue/public/windows").await?;
        Ok(response.windows)
    }

    async fn fetch_videos(&self) -> Result<Vec<Video>> {
        let response: VideosResponse = self.get_json("videos").await?;
        Ok(response.videos)
    }

    async fn fetch_ding_sound_url(&self) -> Result<Option<String>> {
        let response: DingSoundResponse = self.get_json("admin/settings/ding-sound").await?;
        Ok(response.ding_sound_url.filter(|url| !url.trim().is_empty()))
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechPayload> {
        let url = self.endpoint("tts");
        let body = serde_json::to_vec(&TtsRequest { text })?;
        let request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);

        let response = self.send(request, &url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        Ok(SpeechPayload::classify(content_type.as_deref(), bytes.to_vec()))
    }

    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
        let url = resolve_url(&self.asset_base, url)?;
        let response = self.send(self.client.get(url.clone()), url.as_str()).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Parse the API base URL as a directory, so relative assets land beneath it.
pub fn asset_base(base_url: &str) -> Result<Url> {
    let dir = format!("{}/", base_url.trim().trim_end_matches('/'));
    Url::parse(&dir).map_err(|e| MonitorError::InvalidUrl {
        url: base_url.to_string(),
        message: e.to_string(),
    })
}

/// Resolve an asset URL the way a browser on the API's origin would.
///
/// Absolute and protocol-relative URLs keep their own host, `/uploads/x.mp3`
/// resolves against the origin and `uploads/x.mp3` against the API base.
pub fn resolve_url(base: &Url, url: &str) -> Result<Url> {
    base.join(url.trim()).map_err(|e| MonitorError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}
