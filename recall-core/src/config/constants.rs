/// Filesystem locations for recall state
pub mod paths {
    /// Environment variable that overrides the recall home directory
    pub const HOME_ENV_VAR: &str = "RECALL_HOME";
    pub const HOME_DIR_NAME: &str = ".recall";
    pub const CONFIG_FILE_NAME: &str = "config.json";
    pub const DEFAULT_CACHE_PATH: &str = "~/.recall/visual_cache.json";
}

/// Visual memory defaults used when the config file omits a field
pub mod visual_memory {
    pub const DEFAULT_USE_MOCK: bool = true;
    pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 50;
    pub const DEFAULT_CACHE_MAX_SIZE_MB: f64 = 100.0;
    pub const DEFAULT_COMPRESSION_TARGET_RATIO: f64 = 8.0;
    pub const DEFAULT_MOCK_LATENCY_MS: u64 = 100;
    pub const DEFAULT_REMOTE_SERVER_NAME: &str = "deepseek-ocr-runpod";
    pub const DEFAULT_ENABLE_AUTO_COMPRESSION: bool = true;
    pub const DEFAULT_COMPRESSION_AGE_THRESHOLD: usize = 10;
    pub const DEFAULT_REMOTE_TIMEOUT_SECONDS: u64 = 10;
    pub const DEFAULT_REMOTE_MAX_RETRIES: u32 = 3;

    /// The most recent messages are never compressed
    pub const SAFETY_BUFFER: usize = 5;
    /// Tool inputs and results are cut to this many characters when flattened
    pub const TOOL_PREVIEW_CHARS: usize = 500;
    /// Rough characters-per-token used for savings estimates
    pub const CHARS_PER_TEXT_TOKEN: usize = 4;
    /// Prefix of the synthetic identifiers assigned to compressed turns
    pub const MESSAGE_ID_PREFIX: &str = "turn_";
    pub const CACHE_KEY_SEPARATOR: &str = ",";
}

/// Render defaults (square page, monospace font)
pub mod render {
    pub const DEFAULT_RESOLUTION: u32 = 1024;
    pub const DEFAULT_FONT_FAMILY: &str = "JetBrains Mono";
    pub const DEFAULT_FONT_SIZE: u32 = 11;
    pub const DEFAULT_BACKGROUND_COLOR: [u8; 3] = [255, 255, 255];
    pub const DEFAULT_TEXT_COLOR: [u8; 3] = [0, 0, 0];
    pub const DEFAULT_LINE_SPACING: u32 = 2;
    pub const DEFAULT_PADDING: u32 = 20;
    pub const DEFAULT_SYNTAX_HIGHLIGHTING: bool = true;
    pub const DEFAULT_MAX_LINES_PER_IMAGE: usize = 90;

    /// Estimated pixel width of one monospace character
    pub const CHAR_WIDTH_ESTIMATE: u32 = 7;
    /// Characters held back from each line to absorb glyph width variance
    pub const LINE_SAFETY_MARGIN: usize = 10;

    pub const FOOTER_COLOR: [u8; 3] = [128, 128, 128];
    pub const FOOTER_SIZE_REDUCTION: u32 = 3;
    pub const FOOTER_MIN_FONT_SIZE: u32 = 8;

    /// Expected ratios by share of code-like lines
    pub const CODE_HEAVY_THRESHOLD: f64 = 0.7;
    pub const CODE_HEAVY_RATIO: f64 = 10.0;
    pub const MIXED_CONTENT_THRESHOLD: f64 = 0.3;
    pub const MIXED_CONTENT_RATIO: f64 = 7.0;
    pub const PLAIN_TEXT_RATIO: f64 = 5.0;
}

/// Deterministic compression simulator
pub mod simulator {
    pub const TOKEN_COUNT: usize = 256;
    pub const TOKEN_HEX_LEN: usize = 8;
    pub const IMAGE_HASH_PREFIX_LEN: usize = 16;
    pub const MODEL_NAME: &str = "mock-deepseek-ocr";
    pub const MODE: &str = "base";
    pub const RESOLUTION: &str = "1024x1024";
    /// Text tokens assumed per kilobyte of rendered image before applying the ratio
    pub const TEXT_TOKENS_PER_KB: f64 = 4.0;
}

/// Remote OCR service protocol
pub mod remote {
    pub const JSONRPC_VERSION: &str = "2.0";
    pub const CALL_METHOD: &str = "tools/call";
    pub const COMPRESS_TOOL: &str = "compress_visual_tokens";
    pub const DECOMPRESS_TOOL: &str = "decompress_visual_tokens";
    pub const HEALTH_TOOL: &str = "health_check";
    pub const COMPRESSION_LEVEL: &str = "medium";
    pub const HEALTHY_STATUS: &str = "healthy";
    pub const SERVERS_KEY: &str = "mcpServers";
}

/// Visual token cache persistence
pub mod cache {
    pub const SNAPSHOT_VERSION: &str = "1.0";
    /// Estimated bytes held per cached visual token
    pub const BYTES_PER_TOKEN: usize = 8;
    pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
    pub const STATS_KEY_PREVIEW: usize = 10;
    pub const MISS_KEY_PREVIEW: usize = 5;
}

/// Tool name constants to ensure consistency across the codebase
pub mod tools {
    pub const COMPRESS_VISUAL_MEMORY: &str = "CompressVisualMemory";
    pub const DECOMPRESS_VISUAL_MEMORY: &str = "DecompressVisualMemory";
    pub const VISUAL_MEMORY_STATS: &str = "GetVisualMemoryStats";
}
