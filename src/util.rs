use std::time::Duration;

/// HTTP statuses worth another attempt.
///
/// 500 is deliberately absent: SOAP faults are delivered with status 500.
pub(crate) fn retriable_status(code: u16) -> bool {
    matches!(code, 502 | 503 | 504 | 429 | 408)
}

pub(crate) fn backoff(current: Duration, max: Duration) -> Duration {
    let next = Duration::from_secs_f64((current.as_secs_f64() * 1.5).max(1.0));
    if next > max { max } else { next }
}

/// Shortens a response body for log output.
pub(crate) fn preview(body: &str, max_chars: usize) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
