//! Deterministic stand-in for the OCR compression service
//!
//! Tokens are derived from a SHA-256 of the image, so identical pages always
//! compress to identical tokens.

use crate::config::VisualMemoryConfig;
use crate::config::constants::{simulator, visual_memory};
use crate::visual::models::{VisualToken, VisualTokens};
use anyhow::{Result, bail, ensure};
use serde_json::{Map, json};
use sha2::{Digest, Sha256};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SimulatedCompressor {
    target_ratio: f64,
    latency: Duration,
}

impl SimulatedCompressor {
    pub fn new(target_ratio: f64, latency: Duration) -> Self {
        Self {
            target_ratio,
            latency,
        }
    }

    pub fn from_config(config: &VisualMemoryConfig) -> Self {
        Self::new(
            config.compression_target_ratio,
            Duration::from_millis(config.mock_latency_ms),
        )
    }

    pub fn target_ratio(&self) -> f64 {
        self.target_ratio
    }

    /// Compress after waiting out the configured latency
    pub async fn compress(&self, image_bytes: &[u8]) -> VisualTokens {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.compress_now(image_bytes)
    }

    /// Compress without any artificial delay
    pub fn compress_now(&self, image_bytes: &[u8]) -> VisualTokens {
        let image_hash = format!("{:x}", Sha256::digest(image_bytes));
        let data = derive_tokens(&image_hash, simulator::TOKEN_COUNT);

        let size_kb = image_bytes.len() as f64 / 1024.0;
        let estimated_text_tokens =
            (size_kb * simulator::TEXT_TOKENS_PER_KB * self.target_ratio) as u64;

        let mut metadata = Map::new();
        metadata.insert("model".into(), json!(simulator::MODEL_NAME));
        metadata.insert("mode".into(), json!(simulator::MODE));
        metadata.insert("resolution".into(), json!(simulator::RESOLUTION));
        metadata.insert("compression_ratio".into(), json!(self.target_ratio));
        metadata.insert("visual_token_count".into(), json!(data.len()));
        metadata.insert("estimated_text_tokens".into(), json!(estimated_text_tokens));
        metadata.insert(
            "image_hash".into(),
            json!(&image_hash[..simulator::IMAGE_HASH_PREFIX_LEN]),
        );

        VisualTokens::new(data, metadata)
    }

    /// Fixed notice describing the tokens; simulated tokens carry no text
    pub fn decompress(&self, tokens: &VisualTokens) -> String {
        let ratio = tokens.compression_ratio().unwrap_or(self.target_ratio);
        format!(
            "[COMPRESSED VISUAL MEMORY]\n\
             Model: {}\n\
             Visual Tokens: {}\n\
             Compression Ratio: ~{ratio}x\n\
             Original content compressed into visual representation.\n\
             Decompression requires real DeepSeek-OCR model.",
            tokens.model().unwrap_or("unknown"),
            tokens.len(),
        )
    }
}

fn derive_tokens(seed: &str, count: usize) -> Vec<VisualToken> {
    (0..count)
        .map(|i| {
            let digest = format!("{:x}", Sha256::digest(format!("{seed}_{i}").as_bytes()));
            VisualToken::Symbol(digest[..simulator::TOKEN_HEX_LEN].to_string())
        })
        .collect()
}

/// Check that `tokens` look like simulator output
pub fn validate_simulated_tokens(tokens: &VisualTokens) -> Result<()> {
    let model = tokens.model().unwrap_or_default();
    ensure!(
        model.contains("mock"),
        "Tokens do not appear to be from simulated compression"
    );
    ensure!(
        tokens.len() == simulator::TOKEN_COUNT,
        "Expected {} tokens, got {}",
        simulator::TOKEN_COUNT,
        tokens.len()
    );

    for token in &tokens.data {
        let VisualToken::Symbol(symbol) = token else {
            bail!("Token is not a string: {token}");
        };
        ensure!(
            symbol.len() == simulator::TOKEN_HEX_LEN,
            "Token has wrong length: {} (expected {})",
            symbol.len(),
            simulator::TOKEN_HEX_LEN
        );
        ensure!(
            symbol.chars().all(|c| c.is_ascii_hexdigit()),
            "Token is not valid hex: {symbol}"
        );
    }
    Ok(())
}

/// Ratio of estimated text tokens to visual tokens, never below 1
pub fn estimate_compression_ratio(text_length: usize, visual_token_count: usize) -> f64 {
    if visual_token_count == 0 {
        return 1.0;
    }
    let text_tokens = text_length as f64 / visual_memory::CHARS_PER_TEXT_TOKEN as f64;
    (text_tokens / visual_token_count as f64).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compressor() -> SimulatedCompressor {
        SimulatedCompressor::new(8.0, Duration::ZERO)
    }

    #[test]
    fn identical_input_gives_identical_tokens() {
        let first = compressor().compress_now(b"page bytes");
        let second = compressor().compress_now(b"page bytes");
        let other = compressor().compress_now(b"other bytes");

        assert_eq!(first.data, second.data);
        assert_ne!(first.data, other.data);
        assert_eq!(first.len(), 256);
        assert!(validate_simulated_tokens(&first).is_ok());
    }

    #[test]
    fn metadata_describes_the_simulation() {
        let bytes = vec![7u8; 2048];
        let tokens = compressor().compress_now(&bytes);

        assert_eq!(tokens.model(), Some("mock-deepseek-ocr"));
        assert_eq!(tokens.compression_ratio(), Some(8.0));
        assert_eq!(tokens.metadata["visual_token_count"], json!(256));
        assert_eq!(tokens.metadata["estimated_text_tokens"], json!(64));
        assert_eq!(tokens.metadata["resolution"], json!("1024x1024"));
        assert_eq!(
            tokens.metadata["image_hash"].as_str().map(str::len),
            Some(16)
        );
    }

    #[test]
    fn decompress_is_a_notice() {
        let tokens = compressor().compress_now(b"abc");
        let text = compressor().decompress(&tokens);
        assert!(text.starts_with("[COMPRESSED VISUAL MEMORY]"));
        assert!(text.contains("Visual Tokens: 256"));
        assert!(text.contains("Compression Ratio: ~8x"));
    }

    #[test]
    fn validation_rejects_foreign_tokens() {
        let mut tokens = compressor().compress_now(b"abc");
        tokens.data[0] = VisualToken::Id(3);
        assert!(validate_simulated_tokens(&tokens).is_err());

        let mut tokens = compressor().compress_now(b"abc");
        tokens.metadata.insert("model".into(), json!("deepseek-ocr"));
        assert!(validate_simulated_tokens(&tokens).is_err());
    }

    #[test]
    fn ratio_estimate_floors_at_one() {
        assert_eq!(estimate_compression_ratio(100, 256), 1.0);
        assert_eq!(estimate_compression_ratio(8192, 256), 8.0);
        assert_eq!(estimate_compression_ratio(8192, 0), 1.0);
    }

    #[tokio::test]
    async fn async_compress_matches_sync() {
        let compressor = SimulatedCompressor::new(8.0, Duration::from_millis(1));
        let tokens = compressor.compress(b"x").await;
        assert_eq!(tokens.data, compressor.compress_now(b"x").data);
    }
}
