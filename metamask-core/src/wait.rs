//! Bounded waits.
//!
//! A wait polls a condition every `poll` until it holds or `timeout` elapses.
//! Driver errors end the wait immediately; an element that is simply not
//! there yet is not an error.

use crate::driver::{Driver, ElementState};
use crate::error::{ActionError, ActionResult};
use crate::locator::Locator;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Timeout and poll interval of one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll: Duration,
}

/// The three waits every session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicies {
    /// Probing for optional or transient elements.
    pub fast: WaitPolicy,
    pub default: WaitPolicy,
    /// Operations with long latency, such as on-chain confirmation.
    pub slow: WaitPolicy,
}

impl Default for WaitPolicies {
    fn default() -> Self {
        Self {
            fast: WaitPolicy::from_secs(5, 1),
            default: WaitPolicy::from_secs(20, 1),
            slow: WaitPolicy::from_secs(40, 1),
        }
    }
}

impl WaitPolicy {
    pub const fn new(timeout: Duration, poll: Duration) -> Self {
        Self { timeout, poll }
    }

    pub const fn from_secs(timeout: u64, poll: u64) -> Self {
        Self::new(Duration::from_secs(timeout), Duration::from_secs(poll))
    }

    /// Poll `probe` until it yields `Some`.
    ///
    /// The probe always runs at least once, and once more right at the
    /// deadline.
    pub async fn until<T, F, Fut>(&self, what: impl Display, mut probe: F) -> ActionResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(value) = probe().await? {
                return Ok(value);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ActionError::timeout(what.to_string(), self.timeout));
            }
            trace!(%what, "condition not met, polling again");
            tokio::time::sleep(self.poll.min(deadline - now)).await;
        }
    }

    /// Wait until some match of `locator` is clickable; returns its index.
    pub async fn clickable<D: Driver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
    ) -> ActionResult<usize> {
        self.until(format!("{} to be clickable", locator), move || async move {
            let states = driver.inspect(locator).await?;
            Ok(states.iter().position(ElementState::clickable))
        })
        .await
    }

    /// Wait until some match of `locator` is visible; returns its index.
    pub async fn visible<D: Driver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
    ) -> ActionResult<usize> {
        self.until(format!("{} to be visible", locator), move || async move {
            let states = driver.inspect(locator).await?;
            Ok(states.iter().position(|s| s.visible))
        })
        .await
    }

    /// Wait until `locator` matches at least once and every match is visible;
    /// returns the number of matches.
    pub async fn all_visible<D: Driver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
    ) -> ActionResult<usize> {
        self.until(format!("all of {} to be visible", locator), move || async move {
            let states = driver.inspect(locator).await?;
            let ready = !states.is_empty() && states.iter().all(|s| s.visible);
            Ok(ready.then_some(states.len()))
        })
        .await
    }

    /// Wait until `locator` matches at least once.
    pub async fn present<D: Driver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
    ) -> ActionResult<()> {
        self.until(format!("{} to be present", locator), move || async move {
            let states = driver.inspect(locator).await?;
            Ok((!states.is_empty()).then_some(()))
        })
        .await
    }

    /// Wait until no match of `locator` is visible (absent counts as invisible).
    pub async fn invisible<D: Driver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
    ) -> ActionResult<()> {
        self.until(format!("{} to be invisible", locator), move || async move {
            let states = driver.inspect(locator).await?;
            Ok((!states.iter().any(|s| s.visible)).then_some(()))
        })
        .await
    }

    /// Wait until the driver reports exactly `count` windows.
    pub async fn window_count<D: Driver + ?Sized>(&self, driver: &D, count: usize) -> ActionResult<()> {
        self.until(format!("{} windows", count), move || async move {
            let handles = driver.window_handles().await?;
            Ok((handles.len() == count).then_some(()))
        })
        .await
    }

    pub async fn click<D: Driver + ?Sized>(&self, driver: &D, locator: &Locator) -> ActionResult<()> {
        let nth = self.clickable(driver, locator).await?;
        driver.click(locator, nth).await?;
        Ok(())
    }

    /// Wait for a visible match, then type into it.
    pub async fn fill<D: Driver + ?Sized>(
        &self,
        driver: &D,
        locator: &Locator,
        text: &str,
    ) -> ActionResult<()> {
        let nth = self.visible(driver, locator).await?;
        driver.type_text(locator, nth, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick() -> WaitPolicy {
        WaitPolicy::new(Duration::from_millis(60), Duration::from_millis(5))
    }

    #[test]
    fn test_default_policies() {
        let policies = WaitPolicies::default();
        assert_eq!(policies.fast.timeout, Duration::from_secs(5));
        assert_eq!(policies.default.timeout, Duration::from_secs(20));
        assert_eq!(policies.slow.timeout, Duration::from_secs(40));
        assert_eq!(policies.default.poll, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_until_returns_first_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let value = quick()
            .until("third poll", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok((n == 3).then_some(n))
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_until_times_out() {
        let started = std::time::Instant::now();
        let err = quick()
            .until("never", move || async move { Ok(None::<()>) })
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("never"));
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_until_propagates_probe_errors() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let err = quick()
            .until("broken", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Option<()>, _>(anyhow::anyhow!("target crashed"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Driver(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_probes_once() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let policy = WaitPolicy::new(Duration::ZERO, Duration::from_millis(5));
        let ok = policy
            .until("immediate", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(()))
            })
            .await;
        assert!(ok.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
