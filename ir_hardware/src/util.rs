use std::time::Duration;

/// Block until `sample()` has returned `want` for `debounce_n` consecutive polls.
///
/// There is no timeout: an operator input line may legitimately stay idle for
/// as long as the operator takes. Sleeps `poll_interval` between polls.
pub fn wait_for_level(
    mut sample: impl FnMut() -> bool,
    want: bool,
    debounce_n: u8,
    poll_interval: Duration,
) {
    let needed = debounce_n.max(1);
    let mut streak: u8 = 0;
    loop {
        if sample() == want {
            streak = streak.saturating_add(1);
            if streak >= needed {
                return;
            }
        } else {
            streak = 0;
        }
        std::thread::sleep(poll_interval);
    }
}
