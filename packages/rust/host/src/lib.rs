//! The host editor API, as seen from blockpath.
//!
//! [`EditorApi`] is the seam the trackers fetch through. [`HttpEditorApi`]
//! implements it against the host's local HTTP API server, which accepts
//! `POST { "method": "logseq.Editor.<op>", "args": [...] }` with a bearer
//! token and answers with the plugin-API return value as JSON (`null` when
//! there is nothing to return).

use std::future::Future;
use std::time::Duration;

use blockpath_shared::{
    AppConfig, Block, BlockpathError, Page, PageId, Result, resolve_api_token,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

/// User-Agent string for host API requests.
const USER_AGENT: &str = concat!("blockpath/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// EditorApi
// ---------------------------------------------------------------------------

/// Read-only view of the host editor. `Ok(None)` means the host had nothing
/// to return (no block in focus, unknown page); it is not an error.
pub trait EditorApi: Send + Sync {
    /// The block currently focused for editing.
    fn get_current_block(&self) -> impl Future<Output = Result<Option<Block>>> + Send;

    /// A block by durable id.
    fn get_block(&self, uuid: Uuid) -> impl Future<Output = Result<Option<Block>>> + Send;

    /// A page by internal id.
    fn get_page(&self, id: PageId) -> impl Future<Output = Result<Option<Page>>> + Send;

    /// A page by its unique name.
    fn get_page_by_name(&self, name: &str) -> impl Future<Output = Result<Option<Page>>> + Send;

    /// The full ordered block tree of a page.
    fn get_page_blocks_tree(
        &self,
        page_name: &str,
    ) -> impl Future<Output = Result<Option<Vec<Block>>>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpEditorApi`].
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Full URL of the API route, e.g. `http://127.0.0.1:12315/api`.
    pub endpoint: Url,
    /// Bearer token configured in the host.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HostOptions {
    /// Build options from the `[host]` config section and the token env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.host.endpoint).map_err(|e| {
            BlockpathError::config(format!("invalid host.endpoint {:?}: {e}", config.host.endpoint))
        })?;

        Ok(Self {
            endpoint,
            token: resolve_api_token(config)?,
            timeout: Duration::from_secs(config.host.timeout_secs),
        })
    }
}

/// [`EditorApi`] over the host's local HTTP API.
#[derive(Debug, Clone)]
pub struct HttpEditorApi {
    client: Client,
    endpoint: Url,
    token: String,
}

impl HttpEditorApi {
    /// Create a client for the given host.
    pub fn new(opts: HostOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(opts.timeout)
            .build()
            .map_err(|e| BlockpathError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: opts.endpoint,
            token: opts.token,
        })
    }

    /// Invoke one API method and decode its result.
    #[instrument(skip(self, args), fields(endpoint = %self.endpoint))]
    async fn call<T: DeserializeOwned>(&self, method: &str, args: Value) -> Result<Option<T>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&json!({ "method": method, "args": args }))
            .send()
            .await
            .map_err(|e| BlockpathError::Network(format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlockpathError::host(method, format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BlockpathError::Network(format!("{method}: failed to read body: {e}")))?;

        decode_result(method, &body)
    }
}

/// Decode a response body; an empty body or JSON `null` is `None`.
fn decode_result<T: DeserializeOwned>(method: &str, body: &str) -> Result<Option<T>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        debug!(method, "empty response body");
        return Ok(None);
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| BlockpathError::decode(format!("{method}: invalid JSON: {e}")))?;
    if value.is_null() {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| BlockpathError::decode(format!("{method}: unexpected shape: {e}")))
}

impl EditorApi for HttpEditorApi {
    async fn get_current_block(&self) -> Result<Option<Block>> {
        self.call("logseq.Editor.getCurrentBlock", json!([])).await
    }

    async fn get_block(&self, uuid: Uuid) -> Result<Option<Block>> {
        self.call("logseq.Editor.getBlock", json!([uuid])).await
    }

    async fn get_page(&self, id: PageId) -> Result<Option<Page>> {
        self.call("logseq.Editor.getPage", json!([id])).await
    }

    async fn get_page_by_name(&self, name: &str) -> Result<Option<Page>> {
        self.call("logseq.Editor.getPage", json!([name])).await
    }

    async fn get_page_blocks_tree(&self, page_name: &str) -> Result<Option<Vec<Block>>> {
        self.call("logseq.Editor.getPageBlocksTree", json!([page_name])).await
    }
}
