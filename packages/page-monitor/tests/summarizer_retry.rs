//! Summarizer retry, backoff and degradation, on a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use openrouter_client::OpenRouterError;
use page_monitor::pipeline::prompts::truncation_marker;
use page_monitor::testing::MockChatBackend;
use page_monitor::{Summarizer, SummarizerConfig, SummaryError, SUMMARY_UNAVAILABLE};
use tokio::time::Instant;

const URL: &str = "https://example.com/pricing";
const DIFF: &str = "--- previous\n+++ current\n@@ -1 +1 @@\n-Plan: $10\n+Plan: $12\n";

fn summarizer(backend: &MockChatBackend) -> Summarizer {
    Summarizer::with_backend(Arc::new(backend.clone()), SummarizerConfig::default())
}

fn gaps(backend: &MockChatBackend) -> Vec<Duration> {
    backend
        .calls()
        .windows(2)
        .map(|pair| pair[1].at - pair[0].at)
        .collect()
}

/// Paused time advances to timer deadlines at millisecond resolution.
fn assert_about(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

fn assert_gaps(backend: &MockChatBackend, expected_ms: &[u64]) {
    let gaps = gaps(backend);
    assert_eq!(gaps.len(), expected_ms.len());
    for (gap, ms) in gaps.into_iter().zip(expected_ms) {
        assert_about(gap, Duration::from_millis(*ms));
    }
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_third_attempt_after_two_backoffs() {
    let backend = MockChatBackend::new()
        .then_fail(OpenRouterError::Network("connection reset".into()))
        .then_respond_empty()
        .then_respond("The plan price rose from $10 to $12.");

    let summary = summarizer(&backend).summarize(DIFF, URL).await;

    assert_eq!(summary, "The plan price rose from $10 to $12.");
    assert_eq!(backend.call_count(), 3);
    assert_gaps(&backend, &[1000, 2000]);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_return_sentinel() {
    let backend = MockChatBackend::new()
        .then_fail(OpenRouterError::Timeout)
        .then_fail(OpenRouterError::Api {
            status: 502,
            body: "bad gateway".into(),
        })
        .then_respond_empty();
    let start = Instant::now();

    let summary = summarizer(&backend).summarize(DIFF, URL).await;

    assert_eq!(summary, SUMMARY_UNAVAILABLE);
    assert_eq!(backend.call_count(), 3);
    // No sleep after the final attempt
    assert_about(start.elapsed(), Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_transient_error() {
    let backend = MockChatBackend::new();

    let err = summarizer(&backend).try_summarize(DIFF, URL).await.unwrap_err();

    assert!(matches!(err, SummaryError::Transient(_)));
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn missing_credential_costs_no_attempts_or_time() {
    let start = Instant::now();
    let summarizer = Summarizer::unconfigured(SummarizerConfig::default());

    assert_eq!(summarizer.summarize(DIFF, URL).await, SUMMARY_UNAVAILABLE);
    assert!(matches!(
        summarizer.try_summarize(DIFF, URL).await,
        Err(SummaryError::Config(_))
    ));
    assert!(start.elapsed() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn configuration_errors_are_not_retried() {
    let backend = MockChatBackend::new()
        .then_fail(OpenRouterError::Api {
            status: 401,
            body: "invalid api key".into(),
        })
        .then_respond("never reached");
    let start = Instant::now();

    let result = summarizer(&backend).try_summarize(DIFF, URL).await;

    assert!(matches!(result, Err(SummaryError::Config(_))));
    assert_eq!(backend.call_count(), 1);
    assert!(start.elapsed() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn backoff_follows_configured_schedule() {
    let backend = MockChatBackend::new();
    let config = SummarizerConfig::default()
        .with_max_attempts(5)
        .with_base_delay_ms(10);
    let summarizer = Summarizer::with_backend(Arc::new(backend.clone()), config);

    assert_eq!(summarizer.summarize(DIFF, URL).await, SUMMARY_UNAVAILABLE);
    assert_gaps(&backend, &[10, 20, 40, 80]);
}

#[tokio::test]
async fn oversized_diff_is_truncated_before_sending() {
    let backend = MockChatBackend::always("Large rewrite of the page.");
    let head = "+".repeat(12_000);
    let tail = "-".repeat(12_000);
    let diff = format!("{}{}{}", head, "x".repeat(6_500), tail);

    summarizer(&backend).summarize(&diff, URL).await;

    let calls = backend.calls();
    let request = &calls[0].request;
    let prefix = format!("URL: {}\n\nDiff:\n", URL);
    let sent = request.messages[1]
        .content
        .strip_prefix(prefix.as_str())
        .unwrap();

    assert_eq!(sent.len(), 24_000 + truncation_marker(6_500).len());
    assert!(sent.starts_with(&head));
    assert!(sent.ends_with(&tail));
    assert!(sent.contains("6500 characters omitted"));
}

#[tokio::test]
async fn request_carries_grounding_prompt_and_sampling() {
    let backend = MockChatBackend::always("ok");

    summarizer(&backend).summarize(DIFF, URL).await;

    let calls = backend.calls();
    let request = &calls[0].request;
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, "system");
    assert!(request.messages[0].content.contains("explicitly added"));
    assert_eq!(request.messages[1].content, format!("URL: {}\n\nDiff:\n{}", URL, DIFF));
    assert_eq!(request.temperature, Some(0.3));
    assert_eq!(request.max_tokens, Some(300));
}

#[tokio::test]
async fn health_check_is_one_token_round_trip() {
    let backend = MockChatBackend::always("H");

    let latency = summarizer(&backend).check_health().await;

    assert!(latency.is_ok());
    let calls = backend.calls();
    let request = &calls[0].request;
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].content, "Hi");
    assert_eq!(request.max_tokens, Some(1));
}

#[tokio::test(start_paused = true)]
async fn health_check_propagates_failure_without_retry() {
    let backend = MockChatBackend::new().then_fail(OpenRouterError::Network("refused".into()));

    let result = summarizer(&backend).check_health().await;

    assert!(matches!(result, Err(SummaryError::Transient(_))));
    assert_eq!(backend.call_count(), 1);
}
