//! Fetcher implementations.
//!
//! - `HttpFetcher` - reqwest-based fetch with SSRF-checked redirects
//! - `MockFetcher` (in [`crate::testing`]) - canned pages for tests

mod http;

pub use http::HttpFetcher;
pub use crate::traits::fetcher::{Fetcher, RawPage};
