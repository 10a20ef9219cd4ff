//! Language-model client for the Gemini generateContent API.
//!
//! The handler layer depends only on the [`TextGenerator`] trait, so tests
//! substitute doubles and the HTTP client stays swappable. [`GeminiClient`]
//! is the production implementation over the public REST surface.

pub mod client;
pub mod generation;

pub use client::GeminiClient;
pub use generation::{GenerationError, GenerationRequest, GenerationSettings, TextGenerator};
