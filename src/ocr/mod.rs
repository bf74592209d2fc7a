mod client;
mod gateway;
pub mod handlers;
mod parse;
mod prompt;
mod queue;

pub use client::{OpenAiVisionClient, VisionProvider};
pub use gateway::{OcrError, OcrGateway, OcrResponse};
pub use parse::{confidence_score, generate_suggestions, parse_model_reply, Extraction, ParsedLabel};
pub use queue::OcrQueue;
