#![allow(dead_code)]

pub mod env;

use std::time::Duration;

/// Poll `check` until it holds or `deadline` passes.
pub async fn eventually<F>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let started = tokio::time::Instant::now();
    loop {
        if check() {
            return true;
        }
        if started.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
