use recall_core::compression::CompressionClient;
use recall_core::config::{RenderConfig, VisualMemoryConfig};
use recall_core::core::VisualMemorySession;
use recall_core::visual::{ConversationRenderer, FontHandle, VisualCache};
use std::path::Path;

/// Simulator-backed config with no artificial latency
pub fn test_config(cache_path: &Path) -> VisualMemoryConfig {
    VisualMemoryConfig {
        mock_latency_ms: 0,
        cache_path: cache_path.display().to_string(),
        ..VisualMemoryConfig::default()
    }
}

/// Renderer on the builtin bitmap font so output does not depend on installed fonts
pub fn test_renderer() -> ConversationRenderer {
    ConversationRenderer::with_font(RenderConfig::default(), FontHandle::builtin(11))
}

pub fn test_session(cache_path: &Path) -> VisualMemorySession {
    let config = test_config(cache_path);
    let mut cache = VisualCache::from_config(&config);
    cache.load(None);
    let client = CompressionClient::without_remote(&config);
    VisualMemorySession::from_parts(config, cache, test_renderer(), client)
}
