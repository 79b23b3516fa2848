//! SSRF protection.

mod validator;

pub use validator::UrlValidator;
