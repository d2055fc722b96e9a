//! Smoke tests for `ChromeDriver` with a real browser.
//!
//! They launch a headless Chromium through CDP and are `#[ignore]` by default
//! because they need a Chrome/Chromium binary installed.
//!
//! Run with:
//!   cargo test -p metamask-core --test chrome_browser -- --ignored

use metamask_core::{ChromeDriver, Driver, LaunchConfig, Locator, WaitPolicy};

async fn headless() -> ChromeDriver {
    ChromeDriver::launch(LaunchConfig {
        headless: true,
        ..Default::default()
    })
    .await
    .expect("browser should launch")
}

#[tokio::test]
#[ignore]
async fn test_navigate_and_read_heading() {
    let driver = headless().await;
    let heading = Locator::css("h1");

    driver.navigate("https://example.com").await.unwrap();
    WaitPolicy::from_secs(10, 1)
        .visible(&driver, &heading)
        .await
        .unwrap();

    let text = driver.text(&heading).await.unwrap().unwrap_or_default();
    assert!(
        text.contains("Example Domain"),
        "Expected 'Example Domain', got: {}",
        text
    );

    let url = driver.current_url().await.unwrap();
    assert!(url.contains("example.com"), "Expected example.com, got: {}", url);

    driver.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_windows_and_fragment_routes() {
    let driver = headless().await;
    let first = driver.current_window().await.unwrap();

    let second = driver.open_window("https://example.com/").await.unwrap();
    assert_ne!(first, second);
    assert_eq!(driver.current_window().await.unwrap(), second);

    let handles = driver.window_handles().await.unwrap();
    assert!(handles.contains(&first));
    assert!(handles.contains(&second));

    driver
        .navigate("https://example.com/#settings/networks")
        .await
        .unwrap();
    let url = driver.current_url().await.unwrap();
    assert!(url.ends_with("#settings/networks"), "got: {}", url);

    driver.switch_to_window(&first).await.unwrap();
    assert_eq!(driver.current_window().await.unwrap(), first);

    driver.close().await.unwrap();
}
