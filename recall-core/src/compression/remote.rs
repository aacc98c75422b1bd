//! One-shot JSON-RPC invocation of the remote OCR service
//!
//! Each call spawns the configured server command, writes a single
//! `tools/call` request to its stdin and reads the response from stdout.

use crate::config::RemoteServerConfig;
use crate::config::constants::remote;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote server '{0}' is not configured")]
    NotConfigured(String),
    #[error("remote call timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("failed to launch remote server: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("remote server exited with code {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },
    #[error("malformed remote response: {0}")]
    Protocol(String),
    #[error("remote tool reported an error: {0}")]
    ToolError(String),
    #[error("failed to encode remote request: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RemoteError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            RemoteError::NotConfigured(_) | RemoteError::Serialization(_)
        )
    }
}

/// Transport for remote compression operations
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// Call `operation` with `arguments`, returning the `result` payload
    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, RemoteError>;

    /// Human-readable backend name for logs
    fn name(&self) -> &str;
}

/// Launches the server described under `mcpServers` for every call
#[derive(Debug, Clone)]
pub struct StdioInvoker {
    name: String,
    server: RemoteServerConfig,
    timeout: Duration,
}

impl StdioInvoker {
    pub fn new(name: impl Into<String>, server: RemoteServerConfig, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            server,
            timeout,
        }
    }

    async fn run(&self, request: &[u8]) -> Result<std::process::Output, RemoteError> {
        let mut child = Command::new(&self.server.command)
            .args(&self.server.args)
            .envs(&self.server.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RemoteError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request).await.map_err(RemoteError::Spawn)?;
            stdin.write_all(b"\n").await.map_err(RemoteError::Spawn)?;
            stdin.shutdown().await.map_err(RemoteError::Spawn)?;
        }

        child.wait_with_output().await.map_err(RemoteError::Spawn)
    }
}

#[async_trait]
impl RemoteInvoker for StdioInvoker {
    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, RemoteError> {
        let request = json!({
            "jsonrpc": remote::JSONRPC_VERSION,
            "id": 1,
            "method": remote::CALL_METHOD,
            "params": {"name": operation, "arguments": arguments},
        });
        let payload = serde_json::to_vec(&request)?;
        debug!(server = %self.name, operation, bytes = payload.len(), "invoking remote tool");

        let output = tokio::time::timeout(self.timeout, self.run(&payload))
            .await
            .map_err(|_| RemoteError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(RemoteError::ProcessFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_response(&output.stdout)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Extract the `result` of a JSON-RPC response
///
/// The last non-empty stdout line is taken as the response so servers may
/// print banners before it.
pub fn parse_response(stdout: &[u8]) -> Result<Value, RemoteError> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| RemoteError::Protocol("empty response".to_string()))?;

    let mut response: Value = serde_json::from_str(line)
        .map_err(|err| RemoteError::Protocol(format!("invalid JSON: {err}")))?;

    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(RemoteError::ToolError(message));
    }

    response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| RemoteError::Protocol("response has no 'result'".to_string()))
}

/// Unwrap a tool payload that may be wrapped in MCP text content
///
/// `{"content": [{"type": "text", "text": "{...}"}]}` becomes the parsed
/// inner JSON; anything else is returned unchanged.
pub fn unwrap_tool_payload(result: Value) -> Value {
    let inner = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| blocks.first())
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
        .and_then(|text| serde_json::from_str::<Value>(text).ok());
    inner.unwrap_or(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_result_after_banner_lines() {
        let stdout = b"server starting\n{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"status\":\"healthy\"}}\n";
        let result = parse_response(stdout).expect("result");
        assert_eq!(result["status"], "healthy");
    }

    #[test]
    fn error_and_missing_result_are_failures() {
        let error = br#"{"jsonrpc":"2.0","id":1,"error":{"code":-1,"message":"gpu busy"}}"#;
        assert!(matches!(parse_response(error), Err(RemoteError::ToolError(m)) if m == "gpu busy"));

        let empty = br#"{"jsonrpc":"2.0","id":1}"#;
        assert!(matches!(parse_response(empty), Err(RemoteError::Protocol(_))));
        assert!(matches!(parse_response(b"  \n"), Err(RemoteError::Protocol(_))));
    }

    #[test]
    fn unwraps_text_content() {
        let wrapped = json!({"content": [{"type": "text", "text": "{\"tokens\": [1, 2]}"}]});
        assert_eq!(unwrap_tool_payload(wrapped)["tokens"], json!([1, 2]));

        let direct = json!({"tokens": [3]});
        assert_eq!(unwrap_tool_payload(direct.clone()), direct);
    }

    #[test]
    fn configuration_errors_are_not_retried() {
        assert!(!RemoteError::NotConfigured("ocr".into()).is_retryable());
        assert!(RemoteError::Timeout { seconds: 1 }.is_retryable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdio_invoker_round_trip() {
        let server = RemoteServerConfig {
            command: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"cat > /dev/null; echo '{"jsonrpc":"2.0","id":1,"result":{"text":"hello"}}'"#
                    .to_string(),
            ],
            env: Default::default(),
        };
        let invoker = StdioInvoker::new("sh", server, Duration::from_secs(5));
        let result = invoker
            .invoke("decompress_visual_tokens", json!({"tokens": []}))
            .await
            .expect("invoke");
        assert_eq!(result["text"], "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdio_invoker_reports_exit_failure() {
        let server = RemoteServerConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "cat > /dev/null; echo boom >&2; exit 3".to_string()],
            env: Default::default(),
        };
        let invoker = StdioInvoker::new("sh", server, Duration::from_secs(5));
        let err = invoker.invoke("health_check", json!({})).await.unwrap_err();
        assert!(matches!(err, RemoteError::ProcessFailed { code: Some(3), .. }));
    }
}
