#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(rows) = ir_config::parse_telemetry(data) else {
        return;
    };
    assert!(rows.iter().all(|r| r.raw <= 1023));
    // Fitting arbitrary rows may fail but must not panic.
    let _ = ir_config::CubicFit::from_rows(&rows);
});
