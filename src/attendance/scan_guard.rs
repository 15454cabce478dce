use std::future::ready;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

/// Remembers who scanned in the last few seconds so a double tap cannot
/// turn a fresh check-in into an immediate check-out.
///
/// Ages entries on the caller's clock; moka's TTL only bounds memory.
#[derive(Clone)]
pub struct ScanGuard {
    recent: Cache<String, DateTime<Utc>>,
    window: Duration,
}

impl ScanGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            recent: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(window)
                .build(),
            window,
        }
    }

    /// `true` when no other scan for `employee_id` is still inside the window at `now`.
    pub async fn try_acquire(&self, employee_id: &str, now: DateTime<Utc>) -> bool {
        let window = self.window;
        let result = self
            .recent
            .entry_by_ref(employee_id)
            .and_compute_with(|entry| {
                let held = entry
                    .map(|e| e.into_value())
                    .and_then(|last| (now - last).to_std().ok())
                    .is_some_and(|elapsed| elapsed < window);
                ready(if held { Op::Nop } else { Op::Put(now) })
            })
            .await;
        !matches!(result, CompResult::Unchanged(_))
    }

    /// Lets the subject scan again, used when their scan was not recorded.
    pub async fn release(&self, employee_id: &str) {
        self.recent.invalidate(employee_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::test_support::civil_instant;

    #[actix_web::test]
    async fn second_acquire_inside_window_is_refused() {
        let guard = ScanGuard::new(Duration::from_secs(60));
        let now = civil_instant(2025, 6, 10, 8, 5);
        assert!(guard.try_acquire("E1", now).await);
        assert!(!guard.try_acquire("E1", now).await);
        assert!(guard.try_acquire("E2", now).await);
    }

    #[actix_web::test]
    async fn window_elapses_on_the_supplied_clock() {
        let guard = ScanGuard::new(Duration::from_secs(60));
        assert!(guard.try_acquire("E1", civil_instant(2025, 6, 10, 8, 5)).await);
        assert!(!guard.try_acquire("E1", civil_instant(2025, 6, 10, 8, 5)).await);
        assert!(guard.try_acquire("E1", civil_instant(2025, 6, 10, 8, 6)).await);
    }

    #[actix_web::test]
    async fn release_reopens_the_subject() {
        let guard = ScanGuard::new(Duration::from_secs(60));
        let now = civil_instant(2025, 6, 10, 8, 5);
        assert!(guard.try_acquire("E1", now).await);
        guard.release("E1").await;
        assert!(guard.try_acquire("E1", now).await);
    }
}
