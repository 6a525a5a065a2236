use embedded_hal_async::delay::DelayNs;

/// Delay source with a monotonic millisecond clock.
///
/// Settle delays and deferred-work deadlines both go through this, so tests can run on a
/// simulated clock.
pub trait Timebase: DelayNs {
    /// Milliseconds since an arbitrary fixed point.
    fn now_ms(&self) -> u64;
}
