use ir_core::adc::{AdcConfig, IR_CONTROL_VALUE, IR_MUX_VALUE, Prescaler, VoltageReference};
use ir_core::distance::{DistanceModel, analytical_convert, calibrated_convert};
use ir_core::mocks::ScriptedAdc;
use ir_core::sampler::Sampler;
use ir_traits::regs::ADSC;
use rstest::rstest;

#[test]
fn configure_writes_mux_then_control() {
    let mut s = Sampler::new(ScriptedAdc::new([0]));
    s.configure();
    let regs = s.registers();
    assert_eq!(regs.mux_writes, vec![IR_MUX_VALUE]);
    assert_eq!(regs.control_writes, vec![IR_CONTROL_VALUE]);
    assert_eq!(regs.conversions, 0, "configure must not start a conversion");
}

#[test]
fn configure_is_idempotent() {
    let mut s = Sampler::new(ScriptedAdc::new([0]));
    s.configure();
    s.configure();
    s.configure();
    let regs = s.registers();
    assert!(regs.mux_writes.iter().all(|&m| m == 0xC2));
    assert!(regs.control_writes.iter().all(|&c| c == 0x87));
    assert_eq!(regs.mux_writes.len(), 3);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
#[case(40)]
fn read_raw_waits_for_busy_bit(#[case] busy_polls: u32) {
    let mut s = Sampler::new(ScriptedAdc::new([612]).with_busy_polls(busy_polls));
    s.configure();
    assert_eq!(s.read_raw(), 612);
    let regs = s.registers();
    assert_eq!(regs.conversions, 1);
    // One read to trigger, then polls until the busy bit reads clear.
    assert_eq!(regs.control_reads, 1 + busy_polls.max(1));
    let last_write = *regs.control_writes.last().unwrap();
    assert_eq!(last_write, IR_CONTROL_VALUE | ADSC);
}

#[test]
fn read_raw_masks_to_ten_bits() {
    let mut s = Sampler::new(ScriptedAdc::new([0xFFFF, 0x0400, 1023]));
    s.configure();
    assert_eq!(s.read_raw(), 0x03FF);
    assert_eq!(s.read_raw(), 0);
    assert_eq!(s.read_raw(), 1023);
}

#[test]
fn consecutive_reads_each_start_a_conversion() {
    let mut s = Sampler::new(ScriptedAdc::new([10, 20, 30]));
    s.configure();
    let got: Vec<u16> = (0..5).map(|_| s.read_raw()).collect();
    assert_eq!(got, vec![10, 20, 30, 10, 20]);
    assert_eq!(s.registers().conversions, 5);
}

#[test]
fn reading_converts_with_selected_model() {
    let mut s = Sampler::new(ScriptedAdc::new([500]));
    s.configure();
    assert_eq!(s.reading(), calibrated_convert(500));
    assert_eq!(
        s.reading_with(&DistanceModel::Analytical),
        analytical_convert(500)
    );
}

#[test]
fn custom_config_reaches_registers() {
    let cfg = AdcConfig {
        reference: VoltageReference::Avcc,
        channel: 5,
        prescaler: Prescaler::Div64,
        ..AdcConfig::IR_SENSOR
    };
    let mut s = Sampler::with_config(ScriptedAdc::new([0]), cfg);
    s.configure();
    assert_eq!(s.registers().mux_writes, vec![0x45]);
    assert_eq!(s.registers().control_writes, vec![0x86]);
}
