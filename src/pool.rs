//! Browser resource pool
//!
//! A bounded LIFO cache of browser sessions, owned by the worker and passed
//! by reference. Reusing a warm browser beats a cold launch; a browser that
//! has disconnected is discarded so a crash never poisons later
//! acquisitions. The pool applies no backpressure of its own — concurrency
//! is bounded by the queue's worker slots.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bridge::{BridgeError, BrowserDriver};

/// One browser process, exclusively owned by at most one in-flight job.
#[derive(Debug)]
pub struct BrowserSession {
    pub browser_id: String,
}

pub struct BrowserPool {
    driver: Arc<dyn BrowserDriver>,
    idle: Mutex<Vec<BrowserSession>>,
    max_browsers: usize,
    headless: bool,
    viewport: (u32, u32),
}

impl BrowserPool {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        max_browsers: usize,
        headless: bool,
        viewport: (u32, u32),
    ) -> Self {
        Self {
            driver,
            idle: Mutex::new(Vec::new()),
            max_browsers,
            headless,
            viewport,
        }
    }

    /// Pops a live idle session, or launches a new browser when none is
    /// available. Idle sessions that fail the liveness probe are discarded
    /// on the way.
    pub async fn acquire(&self) -> Result<BrowserSession, BridgeError> {
        {
            let mut idle = self.idle.lock().await;
            while let Some(session) = idle.pop() {
                match self.driver.is_connected(&session.browser_id).await {
                    Ok(true) => {
                        debug!(pool_size = idle.len(), "reusing browser from pool");
                        return Ok(session);
                    }
                    Ok(false) | Err(_) => {
                        warn!(browser_id = %session.browser_id, "discarding dead pooled browser");
                        let _ = self.driver.close_browser(&session.browser_id).await;
                    }
                }
            }
        }

        let browser_id = self.driver.launch(self.headless, self.viewport).await?;
        info!(browser_id = %browser_id, "new browser launched");
        Ok(BrowserSession { browser_id })
    }

    /// Returns a session to the pool, or closes it when the pool is full or
    /// the browser is no longer connected.
    pub async fn release(&self, session: BrowserSession) {
        let alive = matches!(
            self.driver.is_connected(&session.browser_id).await,
            Ok(true)
        );
        if !alive {
            debug!(browser_id = %session.browser_id, "dropping disconnected browser");
            let _ = self.driver.close_browser(&session.browser_id).await;
            return;
        }

        let mut idle = self.idle.lock().await;
        if idle.len() < self.max_browsers {
            idle.push(session);
            debug!(pool_size = idle.len(), "browser returned to pool");
        } else {
            drop(idle);
            debug!(browser_id = %session.browser_id, "pool full, closing browser");
            if let Err(e) = self.driver.close_browser(&session.browser_id).await {
                warn!(error = %e, "error closing overflow browser");
            }
        }
    }

    /// Closes every idle session. Called on worker shutdown.
    pub async fn shutdown(&self) {
        let mut idle = self.idle.lock().await;
        info!(pool_size = idle.len(), "cleaning up browser pool");
        for session in idle.drain(..) {
            if let Err(e) = self.driver.close_browser(&session.browser_id).await {
                warn!(error = %e, "error closing pooled browser");
            }
        }
    }

    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }

    pub fn max_browsers(&self) -> usize {
        self.max_browsers
    }
}
