//! Chat backends for the summarizer.

mod openrouter;

pub use openrouter::openrouter_backend;
