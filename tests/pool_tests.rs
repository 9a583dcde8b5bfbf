mod common;

use common::*;
use std::sync::Arc;

use webpilot::{BrowserDriver, BrowserPool};

fn pool(driver: Arc<FakeDriver>, max: usize) -> BrowserPool {
    BrowserPool::new(driver as Arc<dyn BrowserDriver>, max, true, (1920, 1080))
}

#[tokio::test]
async fn test_acquire_launches_when_pool_is_empty() {
    let driver = Arc::new(FakeDriver::new());
    let pool = pool(driver.clone(), 3);

    let session = pool.acquire().await.unwrap();
    assert_eq!(driver.count_calls("launch"), 1);
    assert_eq!(pool.idle_count().await, 0);

    pool.release(session).await;
    assert_eq!(pool.idle_count().await, 1);
}

#[tokio::test]
async fn test_release_reuses_instead_of_launching() {
    let driver = Arc::new(FakeDriver::new());
    let pool = pool(driver.clone(), 3);

    let session = pool.acquire().await.unwrap();
    pool.release(session).await;
    let _session = pool.acquire().await.unwrap();

    assert_eq!(driver.count_calls("launch"), 1);
}

#[tokio::test]
async fn test_idle_pool_never_exceeds_the_cap() {
    let driver = Arc::new(FakeDriver::new());
    let pool = pool(driver.clone(), 2);

    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    let c = pool.acquire().await.unwrap();
    assert_eq!(driver.count_calls("launch"), 3);

    pool.release(a).await;
    pool.release(b).await;
    pool.release(c).await;

    // Two pooled, the overflow session closed.
    assert_eq!(pool.idle_count().await, 2);
    assert_eq!(driver.count_calls("close_browser"), 1);
}

#[tokio::test]
async fn test_launch_failure_surfaces_to_the_caller() {
    let driver = Arc::new(FakeDriver::new().fail_launches(1));
    let pool = pool(driver.clone(), 3);

    assert!(pool.acquire().await.is_err());
    // The next acquisition recovers.
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test]
async fn test_shutdown_closes_all_idle_sessions() {
    let driver = Arc::new(FakeDriver::new());
    let pool = pool(driver.clone(), 3);

    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    pool.release(a).await;
    pool.release(b).await;

    pool.shutdown().await;
    assert_eq!(pool.idle_count().await, 0);
    assert_eq!(driver.count_calls("close_browser"), 2);
}
