//! Vision reasoning service backed by an OpenAI-compatible endpoint.
//!
//! [`VisionLlmClient`] implements [`action_strategies::ReasoningService`]:
//! screenshots go out as base64 data URLs, answers come back as JSON objects
//! that [`parse`] turns into candidates and recommendations.

pub mod client;
pub mod config;
pub mod parse;
pub mod prompt;

pub use client::VisionLlmClient;
pub use config::VisionLlmConfig;
pub use parse::{extract_json_object, parse_candidates, parse_recommendation};
