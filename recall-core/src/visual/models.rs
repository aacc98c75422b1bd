//! Data carried between the renderer, the compression client and the cache

use crate::config::PageFormat;
use crate::config::constants::visual_memory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One opaque visual token
///
/// The simulator produces short hex strings; remote services may answer with
/// integer ids. Both are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisualToken {
    Id(i64),
    Symbol(String),
}

impl fmt::Display for VisualToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisualToken::Id(id) => write!(f, "{id}"),
            VisualToken::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

/// A single rendered page
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub image_bytes: Vec<u8>,
    pub message_ids: Vec<String>,
    pub resolution: (u32, u32),
    pub format: PageFormat,
    pub metadata: Map<String, Value>,
}

impl RenderedImage {
    pub fn size_kb(&self) -> f64 {
        self.image_bytes.len() as f64 / 1024.0
    }

    pub fn page_number(&self) -> Option<u64> {
        self.metadata.get("page_number").and_then(Value::as_u64)
    }
}

/// Output of one compression call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualTokens {
    pub data: Vec<VisualToken>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl VisualTokens {
    pub fn new(data: Vec<VisualToken>, metadata: Map<String, Value>) -> Self {
        Self {
            data,
            metadata,
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Ratio reported by whichever backend produced the tokens
    pub fn compression_ratio(&self) -> Option<f64> {
        self.metadata.get("compression_ratio").and_then(Value::as_f64)
    }

    pub fn model(&self) -> Option<&str> {
        self.metadata.get("model").and_then(Value::as_str)
    }
}

/// A cached compressed block of conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualMemory {
    pub message_ids: Vec<String>,
    pub visual_tokens: VisualTokens,
    /// Length of the flattened source text, in characters
    pub original_text_length: usize,
    pub compression_ratio: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VisualMemory {
    pub fn new(
        message_ids: Vec<String>,
        visual_tokens: VisualTokens,
        original_text_length: usize,
        compression_ratio: f64,
    ) -> Self {
        Self {
            message_ids,
            visual_tokens,
            original_text_length,
            compression_ratio,
            created_at: Utc::now(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn token_count(&self) -> usize {
        self.visual_tokens.len()
    }

    /// Estimated text tokens avoided; negative when the tokens outweigh the text
    pub fn savings_estimate(&self) -> i64 {
        let text_tokens = self.original_text_length / visual_memory::CHARS_PER_TEXT_TOKEN;
        text_tokens as i64 - self.token_count() as i64
    }

    pub fn mode(&self) -> Option<&str> {
        self.metadata.get("mode").and_then(Value::as_str)
    }
}

/// Running counters for compression activity in one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub total_compressions: u64,
    pub total_decompressions: u64,
    pub total_tokens_saved: i64,
    pub average_compression_ratio: f64,
    pub total_latency_ms: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors: u64,
    pub last_compression_at: Option<DateTime<Utc>>,
}

impl CompressionStats {
    pub fn record_compression(&mut self, tokens_saved: i64, ratio: f64, latency_ms: f64) {
        self.total_compressions += 1;
        self.total_tokens_saved += tokens_saved;
        self.total_latency_ms += latency_ms;

        let n = self.total_compressions as f64;
        self.average_compression_ratio = (self.average_compression_ratio * (n - 1.0) + ratio) / n;
        self.last_compression_at = Some(Utc::now());
    }

    pub fn record_decompression(&mut self, latency_ms: f64, cache_hit: bool) {
        self.total_decompressions += 1;
        self.total_latency_ms += latency_ms;
        if cache_hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
    }

    /// A lookup that found nothing to decompress
    pub fn record_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn average_latency_ms(&self) -> f64 {
        let operations = self.total_compressions + self.total_decompressions;
        if operations == 0 {
            0.0
        } else {
            self.total_latency_ms / operations as f64
        }
    }

    /// Cache hit rate in percent
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(count: usize) -> VisualTokens {
        let data = (0..count)
            .map(|i| VisualToken::Symbol(format!("{i:08x}")))
            .collect();
        VisualTokens::new(data, Map::new())
    }

    #[test]
    fn savings_can_be_negative() {
        let memory = VisualMemory::new(vec!["turn_0".into()], tokens(256), 400, 8.0);
        assert_eq!(memory.token_count(), 256);
        assert_eq!(memory.savings_estimate(), 100 - 256);

        let memory = VisualMemory::new(vec!["turn_0".into()], tokens(256), 8000, 8.0);
        assert_eq!(memory.savings_estimate(), 2000 - 256);
    }

    #[test]
    fn average_ratio_is_a_running_mean() {
        let mut stats = CompressionStats::default();
        stats.record_compression(10, 8.0, 100.0);
        stats.record_compression(20, 10.0, 50.0);
        stats.record_compression(30, 12.0, 0.0);

        assert_eq!(stats.total_compressions, 3);
        assert_eq!(stats.total_tokens_saved, 60);
        assert!((stats.average_compression_ratio - 10.0).abs() < 1e-9);
        assert!((stats.average_latency_ms() - 50.0).abs() < 1e-9);
        assert!(stats.last_compression_at.is_some());
    }

    #[test]
    fn hit_rate_counts_only_decompressions() {
        let mut stats = CompressionStats::default();
        assert_eq!(stats.cache_hit_rate(), 0.0);
        assert_eq!(stats.average_latency_ms(), 0.0);

        stats.record_decompression(4.0, true);
        stats.record_decompression(4.0, true);
        stats.record_decompression(4.0, true);
        stats.record_decompression(4.0, false);
        stats.record_error();

        assert_eq!(stats.cache_hit_rate(), 75.0);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn tokens_accept_numeric_and_string_forms() {
        let parsed: Vec<VisualToken> =
            serde_json::from_str(r#"[12, "ab12cd34"]"#).expect("tokens should parse");
        assert_eq!(parsed[0], VisualToken::Id(12));
        assert_eq!(parsed[1].to_string(), "ab12cd34");
    }
}
