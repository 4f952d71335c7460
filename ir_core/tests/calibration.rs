use std::time::Duration;

use ir_core::calibration::{
    CalibrationController, CalibrationTable, MAX_DISTANCE_CM, MIN_DISTANCE_CM,
    SAMPLES_PER_DISTANCE, distances, telemetry_line_count,
};
use ir_core::config::{CalibrationOptions, CalibrationTiming};
use ir_core::error::{BuildError, IrError};
use ir_core::mocks::{CountingButton, Journal, RecordingDisplay, RecordingSerial, ScriptedAdc};
use ir_core::sampler::Sampler;
use ir_core::telemetry;
use ir_traits::clock::test_clock::TestClock;
use rstest::rstest;

/// 50 identical codes per distance, falling with distance.
fn sweep_codes() -> Vec<u16> {
    distances()
        .flat_map(|d| std::iter::repeat_n(1100 - 20 * u16::from(d), SAMPLES_PER_DISTANCE.into()))
        .collect()
}

fn controller(journal: &Journal, serial: Option<RecordingSerial>) -> CalibrationController {
    let mut b = CalibrationController::builder()
        .with_display(RecordingDisplay::new(journal))
        .with_button(CountingButton::new(journal))
        .with_clock(TestClock::new())
        .with_timing(CalibrationTiming::NONE);
    if let Some(s) = serial {
        b = b.with_serial(s);
    }
    b.build().unwrap()
}

fn opts(stream: bool, save: bool) -> CalibrationOptions {
    CalibrationOptions {
        stream_telemetry: stream,
        save_means: save,
    }
}

#[test]
fn visits_every_distance_in_order_with_fifty_samples_each() {
    let journal = Journal::new();
    let mut ctl = controller(&journal, None);
    let mut sampler = Sampler::new(ScriptedAdc::new(sweep_codes()));
    let mut table = CalibrationTable::new();

    let report = ctl
        .run_calibration(&mut sampler, &mut table, opts(false, true))
        .unwrap();

    let visited: Vec<u8> = (MIN_DISTANCE_CM..=MAX_DISTANCE_CM).collect();
    assert_eq!(report.distances, visited);
    assert_eq!(report.samples, 42 * 50);
    assert_eq!(sampler.registers().conversions, 42 * 50);
    assert_eq!(journal.count("button press"), 42);

    let prompts: Vec<String> = journal
        .with_prefix("display Ready to Start ")
        .into_iter()
        .collect();
    assert_eq!(prompts.first().map(String::as_str), Some("9 cm"));
    assert_eq!(prompts.last().map(String::as_str), Some("50 cm"));
    assert_eq!(prompts.len(), 42);
}

#[test]
fn prompt_press_then_sampling_message_per_distance() {
    let journal = Journal::new();
    let mut ctl = controller(&journal, None);
    let mut sampler = Sampler::new(ScriptedAdc::new([500]));
    let mut table = CalibrationTable::new();
    ctl.run_calibration(&mut sampler, &mut table, opts(false, false))
        .unwrap();

    let e = journal.entries();
    assert_eq!(&e[..2], ["display init", "button init"]);
    assert_eq!(
        &e[2..7],
        [
            "display clear",
            "display Ready to Start 9 cm",
            "button press",
            "display clear",
            "display Sampling...",
        ]
    );
}

#[test]
fn saved_means_are_rounded_per_distance() {
    let journal = Journal::new();
    let mut ctl = controller(&journal, None);
    let mut sampler = Sampler::new(ScriptedAdc::new(sweep_codes()));
    let mut table = CalibrationTable::new();
    ctl.run_calibration(&mut sampler, &mut table, opts(false, true))
        .unwrap();

    for d in distances() {
        assert_eq!(table.get(d), Some(1100 - 20 * u16::from(d)), "distance {d}");
    }
    assert!(table.is_strictly_monotonic());
    assert_eq!(table.get(8), None);
}

#[test]
fn mean_of_alternating_codes_rounds_to_midpoint() {
    let journal = Journal::new();
    let mut ctl = controller(&journal, None);
    let mut sampler = Sampler::new(ScriptedAdc::new([100, 102]));
    let mut table = CalibrationTable::new();
    ctl.run_calibration(&mut sampler, &mut table, opts(false, true))
        .unwrap();
    assert!(table.iter().all(|(_, mean)| mean == 101));
}

#[test]
fn running_mean_of_a_ramp_tracks_the_exact_mean() {
    // One full ramp per distance: mean 124.5.
    let ramp: Vec<u16> = (100..150).collect();
    assert_eq!(ramp.len(), SAMPLES_PER_DISTANCE as usize);
    let exact = ramp.iter().map(|&c| f64::from(c)).sum::<f64>() / ramp.len() as f64;
    let expected = exact.round() as i32;

    let journal = Journal::new();
    let mut ctl = controller(&journal, None);
    let mut sampler = Sampler::new(ScriptedAdc::new(ramp));
    let mut table = CalibrationTable::new();
    ctl.run_calibration(&mut sampler, &mut table, opts(false, true))
        .unwrap();

    assert_eq!(table.iter().count(), distances().count());
    for (d, mean) in table.iter() {
        let diff = (i32::from(mean) - expected).abs();
        assert!(diff <= 1, "distance {d}: mean {mean}, expected {expected}");
    }
}

#[test]
fn table_untouched_without_save() {
    let journal = Journal::new();
    let mut ctl = controller(&journal, None);
    let mut sampler = Sampler::new(ScriptedAdc::new(sweep_codes()));
    let mut table = CalibrationTable::new();
    ctl.run_calibration(&mut sampler, &mut table, opts(false, false))
        .unwrap();
    assert!(table.is_zeroed());
}

#[test]
fn streaming_sends_header_then_one_line_per_sample() {
    let journal = Journal::new();
    let mut ctl = controller(&journal, Some(RecordingSerial::new(&journal)));
    let mut sampler = Sampler::new(ScriptedAdc::new([700, 701]));
    let mut table = CalibrationTable::new();
    let report = ctl
        .run_calibration(&mut sampler, &mut table, opts(true, false))
        .unwrap();

    let lines = journal.with_prefix("tx ");
    assert_eq!(lines.len(), 2101);
    assert_eq!(lines.len(), telemetry_line_count());
    assert_eq!(report.telemetry_lines, 2101);
    assert_eq!(lines[0], telemetry::HEADER);
    assert_eq!(lines[1], "9, 700\n");
    assert_eq!(lines[2], "9, 701\n");
    assert_eq!(lines[2100], "50, 701\n");
    assert_eq!(journal.count("serial open"), 1);
    assert!(table.is_zeroed());
}

#[rstest]
#[case(false, false)]
#[case(true, false)]
#[case(false, true)]
#[case(true, true)]
fn switches_are_independent(#[case] stream: bool, #[case] save: bool) {
    let journal = Journal::new();
    let mut ctl = controller(&journal, Some(RecordingSerial::new(&journal)));
    let mut sampler = Sampler::new(ScriptedAdc::new([321]));
    let mut table = CalibrationTable::new();
    ctl.run_calibration(&mut sampler, &mut table, opts(stream, save))
        .unwrap();

    let expected_tx = if stream { 2101 } else { 0 };
    assert_eq!(journal.count("tx "), expected_tx);
    assert_eq!(journal.count("serial open"), usize::from(stream));
    assert_eq!(table.is_zeroed(), !save);
    if save {
        assert!(table.iter().all(|(_, mean)| mean == 321));
    }
    assert_eq!(sampler.registers().conversions, 2100);
}

#[test]
fn streaming_without_serial_fails_before_touching_collaborators() {
    let journal = Journal::new();
    let mut ctl = controller(&journal, None);
    let mut sampler = Sampler::new(ScriptedAdc::new([1]));
    let mut table = CalibrationTable::new();
    let err = ctl
        .run_calibration(&mut sampler, &mut table, opts(true, true))
        .unwrap_err();
    assert!(matches!(err, IrError::State(_)));
    assert!(journal.entries().is_empty());
    assert_eq!(sampler.registers().conversions, 0);
}

#[test]
fn serial_failure_aborts_session() {
    let journal = Journal::new();
    let serial = RecordingSerial::new(&journal).failing_after(3);
    let mut ctl = controller(&journal, Some(serial));
    let mut sampler = Sampler::new(ScriptedAdc::new([9]));
    let mut table = CalibrationTable::new();
    let err = ctl
        .run_calibration(&mut sampler, &mut table, opts(true, true))
        .unwrap_err();
    assert_eq!(err, IrError::Transport("serial buffer overrun".into()));
    // Header plus two samples made it out; the third sample was read but not sent.
    assert_eq!(journal.count("tx "), 3);
    assert_eq!(sampler.registers().conversions, 3);
    assert!(table.is_zeroed());
}

#[test]
fn default_timing_sleeps_in_documented_pattern() {
    let journal = Journal::new();
    let clock = TestClock::new();
    let mut ctl = CalibrationController::builder()
        .with_display(RecordingDisplay::new(&journal))
        .with_button(CountingButton::new(&journal))
        .with_clock(clock.clone())
        .build()
        .unwrap();
    assert_eq!(*ctl.timing(), CalibrationTiming::default());

    let mut sampler = Sampler::new(ScriptedAdc::new([10]));
    let mut table = CalibrationTable::new();
    ctl.run_calibration(&mut sampler, &mut table, opts(false, false))
        .unwrap();

    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 1 + 42 * 51);
    assert_eq!(sleeps[0], Duration::from_millis(500));
    assert_eq!(sleeps[1], Duration::from_millis(500));
    assert!(sleeps[2..52].iter().all(|&d| d == Duration::from_millis(20)));
    assert_eq!(clock.elapsed(), Duration::from_millis(500 + 42 * (500 + 50 * 20)));
}

#[test]
fn builder_requires_display_and_button() {
    let journal = Journal::new();

    let err = match CalibrationController::builder().build() {
        Err(e) => e,
        Ok(_) => panic!("should fail without display"),
    };
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingDisplay)
    ));

    let err = match CalibrationController::builder()
        .with_display(RecordingDisplay::new(&journal))
        .build()
    {
        Err(e) => e,
        Ok(_) => panic!("should fail without button"),
    };
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingButton)
    ));
}
