//! Cooperative delays for the browser event loop.
//!
//! TRADE-OFFS
//! ==========
//! Off-browser there is no event loop to yield to, so `sleep` returns
//! immediately; SSR and tests never wait on wall-clock time.

use std::time::Duration;

/// Suspend the current task for `duration` without blocking the loop.
#[allow(clippy::unused_async)]
pub async fn sleep(duration: Duration) {
    #[cfg(feature = "hydrate")]
    {
        gloo_timers::future::sleep(duration).await;
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = duration;
    }
}
