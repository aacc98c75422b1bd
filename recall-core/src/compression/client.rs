use crate::compression::remote::{RemoteError, RemoteInvoker, StdioInvoker, unwrap_tool_payload};
use crate::compression::retry::RetryConfig;
use crate::compression::simulator::SimulatedCompressor;
use crate::config::constants::remote;
use crate::config::{ConfigManager, VisualMemoryConfig};
use crate::visual::models::{VisualToken, VisualTokens};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which backend compressions go to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    Simulated,
    Remote,
}

impl CompressionMode {
    pub fn from_use_mock(use_mock: bool) -> Self {
        if use_mock {
            CompressionMode::Simulated
        } else {
            CompressionMode::Remote
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompressionMode::Simulated => "MOCK",
            CompressionMode::Remote => "REAL",
        }
    }
}

/// Compresses rendered pages into visual tokens
///
/// In remote mode every failure (missing server, timeout, bad response)
/// falls back to the simulator, so [`CompressionClient::compress`] always
/// yields tokens.
pub struct CompressionClient {
    mode: CompressionMode,
    simulator: SimulatedCompressor,
    remote: Option<Arc<dyn RemoteInvoker>>,
    retry: RetryConfig,
}

impl std::fmt::Debug for CompressionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionClient")
            .field("mode", &self.mode)
            .field("simulator", &self.simulator)
            .field("remote", &self.remote.as_ref().map(|r| r.name().to_string()))
            .field("retry", &self.retry)
            .finish()
    }
}

impl CompressionClient {
    /// Simulator only; remote mode will always fall back
    pub fn without_remote(config: &VisualMemoryConfig) -> Self {
        Self {
            mode: CompressionMode::from_use_mock(config.use_mock),
            simulator: SimulatedCompressor::from_config(config),
            remote: None,
            retry: RetryConfig::with_attempts(config.remote_max_retries),
        }
    }

    /// Resolve the remote server from the `mcpServers` section of `manager`
    pub fn from_config(config: &VisualMemoryConfig, manager: &ConfigManager) -> Self {
        let mut client = Self::without_remote(config);
        match manager.remote_server(&config.remote_server_name) {
            Some(server) => {
                let invoker = StdioInvoker::new(
                    config.remote_server_name.clone(),
                    server,
                    Duration::from_secs(config.remote_timeout_seconds),
                );
                client.remote = Some(Arc::new(invoker));
            }
            None if !config.use_mock => warn!(
                server = %config.remote_server_name,
                "remote compression requested but server is not configured; using simulator"
            ),
            None => {}
        }
        client
    }

    /// Use a specific transport for remote calls
    pub fn with_invoker(config: &VisualMemoryConfig, invoker: Arc<dyn RemoteInvoker>) -> Self {
        Self {
            remote: Some(invoker),
            ..Self::without_remote(config)
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn mode(&self) -> CompressionMode {
        self.mode
    }

    pub fn mode_label(&self) -> &'static str {
        self.mode.label()
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn switch_mode(&mut self, use_mock: bool) {
        self.mode = CompressionMode::from_use_mock(use_mock);
        if self.mode == CompressionMode::Remote && self.remote.is_none() {
            warn!("switched to remote compression without a server; calls will fall back");
        }
        info!(mode = self.mode.label(), "compression mode changed");
    }

    /// Compress one encoded page
    pub async fn compress(&self, image_bytes: &[u8]) -> VisualTokens {
        if self.mode == CompressionMode::Simulated {
            return self.simulator.compress(image_bytes).await;
        }

        match self.try_remote_compress(image_bytes).await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(error = %err, "remote compression failed, falling back to simulator");
                let mut tokens = self.simulator.compress(image_bytes).await;
                tokens.metadata.insert("fallback".into(), json!(true));
                tokens.metadata.insert("fallback_reason".into(), json!(err.to_string()));
                tokens
            }
        }
    }

    /// Recover text from tokens; the simulator only returns a notice
    pub async fn decompress(&self, tokens: &VisualTokens) -> String {
        if self.mode == CompressionMode::Simulated {
            return self.simulator.decompress(tokens);
        }

        match self.try_remote_decompress(tokens).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "remote decompression failed, falling back to simulator");
                self.simulator.decompress(tokens)
            }
        }
    }

    /// Whether the active backend is usable
    pub async fn health_check(&self) -> bool {
        if self.mode == CompressionMode::Simulated {
            return true;
        }

        match self.invoke(remote::HEALTH_TOOL, json!({})).await {
            Ok(result) => {
                let payload = unwrap_tool_payload(result);
                payload.get("status").and_then(Value::as_str) == Some(remote::HEALTHY_STATUS)
            }
            Err(err) => {
                warn!(error = %err, "remote health check failed");
                false
            }
        }
    }

    async fn try_remote_compress(&self, image_bytes: &[u8]) -> Result<VisualTokens, RemoteError> {
        let arguments = json!({
            "image_base64": STANDARD.encode(image_bytes),
            "compression_level": remote::COMPRESSION_LEVEL,
        });
        let payload = unwrap_tool_payload(self.invoke(remote::COMPRESS_TOOL, arguments).await?);

        let tokens = payload
            .get("tokens")
            .cloned()
            .ok_or_else(|| RemoteError::Protocol("compression result has no 'tokens'".into()))?;
        let data: Vec<VisualToken> = serde_json::from_value(tokens)
            .map_err(|err| RemoteError::Protocol(format!("invalid tokens: {err}")))?;
        let metadata = payload
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        debug!(tokens = data.len(), "remote compression succeeded");
        Ok(VisualTokens::new(data, metadata))
    }

    async fn try_remote_decompress(&self, tokens: &VisualTokens) -> Result<String, RemoteError> {
        let arguments = json!({ "tokens": tokens.data });
        let payload = unwrap_tool_payload(self.invoke(remote::DECOMPRESS_TOOL, arguments).await?);
        payload
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Protocol("decompression result has no 'text'".into()))
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, RemoteError> {
        let invoker = self
            .remote
            .as_ref()
            .ok_or_else(|| RemoteError::NotConfigured(operation.to_string()))?;

        let mut attempt = 1;
        loop {
            match invoker.invoke(operation, arguments.clone()).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    warn!(
                        backend = invoker.name(),
                        operation,
                        attempt,
                        error = %err,
                        "remote call failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
