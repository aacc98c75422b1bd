use crate::compression::CompressionClient;
use crate::config::{ConfigManager, VisualMemoryConfig};
use crate::core::conversation::{ConversationContext, Message};
use crate::core::visual_compaction::{CompactionReport, VisualCompactor};
use crate::visual::cache::VisualCache;
use crate::visual::renderer::ConversationRenderer;
use tracing::{debug, info};

/// Everything one conversation needs for visual memory
///
/// The session owns its cache and statistics; nothing is process-global.
#[derive(Debug)]
pub struct VisualMemorySession {
    pub context: ConversationContext,
    pub compactor: VisualCompactor,
    config: VisualMemoryConfig,
}

impl VisualMemorySession {
    /// Session backed by the configured cache file and remote server
    pub fn open(manager: &ConfigManager) -> Self {
        let config = manager.config().clone();
        let mut cache = VisualCache::from_config(&config);
        if cache.load(None) {
            info!(entries = cache.len(), "restored visual cache");
        }
        let client = CompressionClient::from_config(&config, manager);
        let renderer = ConversationRenderer::new(config.render.clone());
        Self::from_parts(config, cache, renderer, client)
    }

    pub fn from_parts(
        config: VisualMemoryConfig,
        cache: VisualCache,
        renderer: ConversationRenderer,
        client: CompressionClient,
    ) -> Self {
        debug!(
            mode = client.mode_label(),
            font = renderer.font_name(),
            "visual memory session ready"
        );
        Self {
            context: ConversationContext::new(cache),
            compactor: VisualCompactor::new(&config, renderer, client),
            config,
        }
    }

    pub fn config(&self) -> &VisualMemoryConfig {
        &self.config
    }

    pub fn add_message(&mut self, message: Message) {
        self.context.add_message(message);
    }

    pub fn enable_visual_compression(&mut self, enabled: bool) {
        self.compactor.set_enabled(enabled);
    }

    /// Switch between simulated and remote compression
    pub fn switch_mode(&mut self, use_mock: bool) {
        self.config.use_mock = use_mock;
        self.compactor.client_mut().switch_mode(use_mock);
    }

    /// Compress old turns in place
    pub async fn run_garbage_collection(&mut self) -> CompactionReport {
        self.compactor.compress_old_messages(&mut self.context).await
    }

    pub fn compression_status(&self) -> String {
        self.compactor.build_compression_status(&self.context)
    }

    /// Save the cache to its configured file
    pub fn persist(&self) -> bool {
        self.context.visual_cache.save(None)
    }
}
