#![no_main]
use libfuzzer_sys::fuzz_target;

// Arbitrary text must either fail to parse, fail validation, or yield a
// config whose validated values are all in range. Never a panic.
fuzz_target!(|data: &str| {
    let Ok(cfg) = ir_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        assert!(cfg.adc.channel <= 7);
        assert!(cfg.adc.prescaler.is_power_of_two() && (2..=128).contains(&cfg.adc.prescaler));
        assert!(cfg.serial.baud > 0);
    }
});
