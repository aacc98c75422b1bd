//! Visual token compression
//!
//! [`CompressionClient`] fronts two backends: a deterministic simulator and a
//! remote OCR service reached over stdio JSON-RPC. Remote failures are
//! retried and then absorbed by falling back to the simulator.

pub mod client;
pub mod remote;
pub mod retry;
pub mod simulator;

pub use client::{CompressionClient, CompressionMode};
pub use remote::{RemoteError, RemoteInvoker, StdioInvoker};
pub use retry::RetryConfig;
pub use simulator::{SimulatedCompressor, estimate_compression_ratio, validate_simulated_tokens};
