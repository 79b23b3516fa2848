//! The change-detection pipeline.
//!
//! - [`readable`] - Readable-text extraction from HTML
//! - [`detect`] - Content digests and change classification
//! - [`diff`] - Unified diffs and preview snippets
//! - [`prompts`] - LLM prompts and diff truncation
//! - [`summarize`] - LLM summaries with retry/backoff and a health check
//! - [`monitor`] - Orchestration per target and per batch

pub mod detect;
pub mod diff;
pub mod monitor;
pub mod prompts;
pub mod readable;
pub mod summarize;

pub use detect::{classify, content_hash, has_changed, ChangeKind};
pub use diff::{compute_diff, extract_snippet, DiffResult, DEFAULT_SNIPPET_LEN};
pub use monitor::Monitor;
pub use prompts::{truncate_diff, truncation_marker, user_prompt, SYSTEM_PROMPT};
pub use readable::{extract_readable_text, normalize_whitespace, ReadableText};
pub use summarize::{AttemptOutcome, Summarizer, SUMMARY_UNAVAILABLE};
