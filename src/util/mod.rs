use futures::future::{self, Either};
use std::future::Future;
use std::time::Duration;

#[cfg(target_arch = "wasm32")]
pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Short lowercase hex suffix for ids that must not collide across calls.
pub(crate) fn random_suffix() -> String {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_err() {
        // Uniqueness is also carried by the caller's counter.
        return "0".to_string();
    }
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(target_arch = "wasm32")]
pub(crate) async fn sleep(d: Duration) {
    gloo_timers::future::sleep(d).await;
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) async fn sleep(d: Duration) {
    let (tx, rx) = futures::channel::oneshot::channel::<()>();
    std::thread::spawn(move || {
        std::thread::sleep(d);
        let _ = tx.send(());
    });
    let _ = rx.await;
}

/// Races `fut` against a timer. The losing future is dropped, which is what
/// releases any resources it holds.
pub(crate) async fn with_timeout<F: Future>(d: Duration, fut: F) -> Result<F::Output, Duration> {
    let fut = std::pin::pin!(fut);
    let timer = std::pin::pin!(sleep(d));
    match future::select(fut, timer).await {
        Either::Left((out, _)) => Ok(out),
        Either::Right(((), _)) => Err(d),
    }
}
