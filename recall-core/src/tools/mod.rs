//! Agent-facing tools for visual memory

pub mod registry;
pub mod traits;
pub mod visual_memory;

pub use registry::{FunctionDeclaration, ToolRegistry};
pub use traits::Tool;
pub use visual_memory::{
    CompressVisualMemoryTool, DecompressVisualMemoryTool, VisualMemoryStatsTool,
};
