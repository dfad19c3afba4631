use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static LAST_NOW_MS: AtomicU64 = AtomicU64::new(1);

fn normalize_now_ms(last: &AtomicU64, sample_ms: Option<u64>) -> u64 {
    let mut prev = last.load(Ordering::Relaxed);
    loop {
        let normalized = sample_ms.unwrap_or(prev).max(prev).max(1);
        match last.compare_exchange_weak(
            prev,
            normalized,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return normalized,
            Err(actual) => prev = actual,
        }
    }
}

/// Wall-clock milliseconds that never move backwards within the process and are never zero.
pub fn now_ms() -> u64 {
    let sample = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64);
    normalize_now_ms(&LAST_NOW_MS, sample)
}

/// Unix seconds, the unit the lottery programs store timestamps in.
pub fn now_unix_secs() -> i64 {
    (now_ms() / 1_000) as i64
}
