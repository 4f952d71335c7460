//! Blocking primitives shared by the sampler.

/// Spin until `is_set` reports false and return how many extra polls it took.
///
/// This is a true busy-wait: no sleeping, no yielding and no timeout. The
/// caller owns the core until the hardware flag clears.
#[inline]
pub fn spin_until_clear(mut is_set: impl FnMut() -> bool) -> u32 {
    let mut polls: u32 = 0;
    while is_set() {
        polls = polls.saturating_add(1);
        std::hint::spin_loop();
    }
    polls
}
