//! Phase timing.

use std::time::Instant;

/// Run `f` and log its wall time under `label`.
///
/// Timings go to `info` when `verbose` is set and to `debug` otherwise.
pub fn timed<R>(verbose: bool, label: &str, f: impl FnOnce() -> R) -> R {
    let start = Instant::now();
    let out = f();
    let ms = start.elapsed().as_secs_f64() * 1e3;
    if verbose {
        log::info!("{label}: {ms:.3} ms");
    } else {
        log::debug!("{label}: {ms:.3} ms");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_closure_result() {
        assert_eq!(timed(true, "sum", || (1..=4).sum::<i32>()), 10);
        let r: Result<u8, String> = timed(false, "fail", || Err("no".to_string()));
        assert!(r.is_err());
    }
}
