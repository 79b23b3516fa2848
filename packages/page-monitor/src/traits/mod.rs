//! Seams between the pipeline and the outside world.
//!
//! - [`fetcher::Fetcher`] retrieves raw HTML
//! - [`llm::ChatBackend`] answers chat completions for the summarizer
//! - [`store::SnapshotStore`] keeps check history
//! - [`store::LinkStore`] keeps the registered links

pub mod fetcher;
pub mod llm;
pub mod store;
