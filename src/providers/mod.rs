//! Generative model providers

pub mod gemini;

// Re-export for convenience
pub use gemini::{GeminiClient, GenerateArgs};
