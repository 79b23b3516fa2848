//! LLM prompts for change summaries.
//!
//! The system prompt keeps the model grounded in the literal diff; a summary
//! that invents claims about a page is worse than no summary.

use std::borrow::Cow;

/// System instruction for change summaries.
pub const SYSTEM_PROMPT: &str = r#"You are a precise analyst of webpage changes.
You will receive a unified diff of the visible text of a webpage.

RULES:
1. Describe ONLY content that is explicitly added (lines starting with +) or removed (lines starting with -).
2. Do not infer visual design, layout, styling or intent unless the changed text states it literally.
3. Do not invent file names, page sections or structure that do not appear as text in the diff.
4. Describe technical metadata changes (tags, identifiers, timestamps) neutrally as "metadata updates".
5. Respond in 2-4 plain, professional sentences."#;

/// Prompt for the health check.
pub const HEALTH_PROMPT: &str = "Hi";

/// User message carrying the target URL and its (truncated) diff.
pub fn user_prompt(url: &str, diff: &str) -> String {
    format!("URL: {}\n\nDiff:\n{}", url, diff)
}

/// Marker inserted where the middle of an oversized diff was dropped.
pub fn truncation_marker(omitted: usize) -> String {
    format!("\n\n... [diff truncated — {} characters omitted] ...\n\n", omitted)
}

/// Cut a diff to `max_chars` characters, keeping the first and last halves
/// verbatim around a [`truncation_marker`].
pub fn truncate_diff(diff: &str, max_chars: usize) -> Cow<'_, str> {
    let total = diff.chars().count();
    if total <= max_chars {
        return Cow::Borrowed(diff);
    }

    let half = max_chars / 2;
    let head_end = byte_offset(diff, half);
    let tail_start = byte_offset(diff, total - half);

    Cow::Owned(format!(
        "{}{}{}",
        &diff[..head_end],
        truncation_marker(total - 2 * half),
        &diff[tail_start..]
    ))
}

/// Byte offset of the `n`th character.
fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
