//! Generative-text provider implementations

mod gemini;

pub use gemini::{GeminiProvider, DEFAULT_GEMINI_BASE_URL};
