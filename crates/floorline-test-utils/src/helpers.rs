//! Helper functions for common testing scenarios.

use uuid::Uuid;

pub fn unique_email() -> String {
    format!(
        "test-{}@example.com",
        Uuid::new_v4().to_string().split('-').next().unwrap()
    )
}

pub fn unique_sku(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        Uuid::new_v4().to_string().split('-').next().unwrap()
    )
}

/// Waits for a condition to become true, panicking on timeout. Useful for
/// asserting on background work (relay, pools) in async tests.
pub async fn wait_for<F>(condition: F, timeout: std::time::Duration)
where
    F: Fn() -> bool,
{
    let start = std::time::Instant::now();
    let check_interval = std::time::Duration::from_millis(10);

    while !condition() {
        if start.elapsed() > timeout {
            panic!("Timeout waiting for condition");
        }
        tokio::time::sleep(check_interval).await;
    }
}

#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Err(e) => e,
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
        }
    };
}
