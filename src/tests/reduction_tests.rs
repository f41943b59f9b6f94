use approx::assert_abs_diff_eq;
use chrono::NaiveDate;

use super::{almanac, sighting};
use crate::correction::{fahrenheit_to_celsius, refraction};
use crate::reduction::{
    apply_defaults, parse_timestamp, resolve_aries, resolve_star, seconds_into_hour, validate_mandatory,
    validate_observation,
};
use crate::{reduce_sightings, Environment, Horizon, Interrupt, SightError, SightingRecord};

#[test]
fn single_sighting_end_to_end() {
    let records = [sighting("Sun", "2024-01-01", "10:30:00", "45d0.0")];
    let reduction = reduce_sightings(&records, &almanac(), &Environment::default()).unwrap();

    assert_eq!(reduction.diagnostics.error_count(), 0);
    assert_eq!(reduction.sightings.len(), 1);

    let sun = &reduction.sightings[0];
    assert_eq!(sun.body, "Sun");
    assert_eq!(sun.date, "2024-01-01");
    assert_eq!(sun.time, "10:30:00");
    assert_eq!(
        sun.timestamp,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 30, 0).unwrap()
    );
    assert!(sun.errors.is_empty());

    // altitude 45 + dip 0 + refraction (about -0.0155 degrees)
    let expected = 45.0 + refraction(1010.0, fahrenheit_to_celsius(72.0), 45.0);
    assert!(expected < 45.0);
    assert_eq!(sun.corrected_altitude.degrees(), 44);
    assert_abs_diff_eq!(sun.corrected_altitude.minutes(), (expected - 44.0) * 60.0, epsilon = 1e-9);
    assert_eq!(sun.corrected_altitude.to_string(), "44d59.1");

    // GHA Aries 45.5 at half past, plus SHA 10d15.0
    assert_eq!(sun.longitude.to_string(), "55d45.0");
    assert_eq!(sun.latitude, "-23d4.5");
}

#[test]
fn missing_body_skips_only_that_sighting() {
    let mut headless = sighting("Sirius", "2024-01-01", "10:00:00", "30d0.0");
    headless.body = None;
    let records = [headless, sighting("Sirius", "2024-01-01", "10:15:00", "30d0.0")];

    let reduction = reduce_sightings(&records, &almanac(), &Environment::default()).unwrap();
    assert_eq!(reduction.sightings.len(), 1);
    assert_eq!(reduction.diagnostics.error_count(), 1);
    assert_eq!(reduction.diagnostics.messages(), ["body tag is missing"]);
}

#[test]
fn every_missing_mandatory_tag_is_counted() {
    let mut no_date = sighting("Sun", "2024-01-01", "10:00:00", "30d0.0");
    no_date.date = None;
    let mut no_time = sighting("Sun", "2024-01-01", "10:00:00", "30d0.0");
    no_time.time = None;
    let mut no_observation = sighting("Sun", "2024-01-01", "10:00:00", "30d0.0");
    no_observation.observation = None;

    let reduction =
        reduce_sightings(&[no_date, no_time, no_observation], &almanac(), &Environment::default()).unwrap();
    assert!(reduction.sightings.is_empty());
    assert_eq!(reduction.diagnostics.error_count(), 3);
}

#[test]
fn observation_beyond_90_degrees_aborts_the_run() {
    let records = [
        sighting("Sun", "2024-01-01", "10:30:00", "45d0.0"),
        sighting("Sun", "2024-01-01", "10:45:00", "91d0.0"),
    ];
    let err = reduce_sightings(&records, &almanac(), &Environment::default()).unwrap_err();
    assert!(matches!(err, SightError::RangeViolation(_)));
}

#[test]
fn negative_observation_aborts_the_run() {
    assert!(matches!(
        validate_observation("-1d30.0"),
        Err(Interrupt::AbortRun(SightError::RangeViolation(_)))
    ));
    assert!(matches!(
        validate_observation("forty-five"),
        Err(Interrupt::AbortRun(SightError::InvalidInput(_)))
    ));
    assert!(validate_observation("90d0.0").is_ok());
}

#[test]
fn unknown_star_is_skipped_and_counted() {
    let records = [
        sighting("Polaris", "2024-01-01", "10:30:00", "45d0.0"),
        sighting("Sirius", "2024-01-01", "10:30:00", "45d0.0"),
    ];
    let reduction = reduce_sightings(&records, &almanac(), &Environment::default()).unwrap();
    assert_eq!(reduction.sightings.len(), 1);
    assert_eq!(reduction.sightings[0].body, "Sirius");
    assert_eq!(reduction.diagnostics.error_count(), 1);
    assert!(reduction.diagnostics.messages()[0].contains("Polaris"));
}

#[test]
fn missing_aries_hour_is_skipped() {
    let records = [sighting("Sun", "2024-01-01", "03:30:00", "45d0.0")];
    let reduction = reduce_sightings(&records, &almanac(), &Environment::default()).unwrap();
    assert!(reduction.sightings.is_empty());
    assert_eq!(reduction.diagnostics.error_count(), 1);
}

#[test]
fn aries_match_on_last_row_aborts() {
    let records = [sighting("Sun", "2024-01-01", "12:10:00", "45d0.0")];
    let err = reduce_sightings(&records, &almanac(), &Environment::default()).unwrap_err();
    assert!(matches!(err, SightError::EndOfTable { hour: 12, .. }));
}

#[test]
fn results_are_ordered_by_time_then_body() {
    let records = [
        sighting("Sun", "2024-01-01", "11:00:00", "45d0.0"),
        sighting("Sirius", "2024-01-01", "10:30:00", "45d0.0"),
        sighting("Betelgeuse", "2024-01-01", "10:30:00", "45d0.0"),
        sighting("Sun", "2024-01-01", "09:15:00", "45d0.0"),
    ];
    let reduction = reduce_sightings(&records, &almanac(), &Environment::default()).unwrap();
    let order: Vec<(&str, &str)> = reduction
        .sightings
        .iter()
        .map(|s| (s.body.as_str(), s.time.as_str()))
        .collect();
    assert_eq!(
        order,
        [
            ("Sun", "09:15:00"),
            ("Betelgeuse", "10:30:00"),
            ("Sirius", "10:30:00"),
            ("Sun", "11:00:00"),
        ]
    );
}

#[test]
fn defaults_fill_absent_fields() {
    let record = sighting("Sun", "2024-01-01", "10:30:00", "45d0.0");
    let (environment, warnings) = apply_defaults(&record, &Environment::default()).unwrap();
    assert_eq!(environment, Environment::default());
    assert!(warnings.is_empty());

    let configured = Environment::new(6.0, 50.0, 1000.0, Horizon::Artificial).unwrap();
    let (environment, _) = apply_defaults(&record, &configured).unwrap();
    assert_eq!(environment, configured);
}

#[test]
fn record_values_override_defaults() {
    let record = SightingRecord {
        height: Some("9".into()),
        temperature: Some("50".into()),
        pressure: Some("995.5".into()),
        horizon: Some("Artificial".into()),
        ..sighting("Sun", "2024-01-01", "10:30:00", "45d0.0")
    };
    let (environment, warnings) = apply_defaults(&record, &Environment::default()).unwrap();
    assert_eq!(environment.height(), 9.0);
    assert_eq!(environment.temperature(), 50.0);
    assert_eq!(environment.pressure(), 995.5);
    assert_eq!(environment.horizon(), Horizon::Artificial);
    assert_eq!(environment.dip(), 0.0);
    assert!(warnings.is_empty());
}

#[test]
fn unknown_horizon_is_a_warning_not_an_error() {
    let record = SightingRecord {
        height: Some("9".into()),
        horizon: Some("bubble".into()),
        ..sighting("Sun", "2024-01-01", "10:30:00", "45d0.0")
    };
    let reduction = reduce_sightings(&[record], &almanac(), &Environment::default()).unwrap();
    assert_eq!(reduction.diagnostics.error_count(), 0);
    let sun = &reduction.sightings[0];
    assert_eq!(sun.errors.len(), 1);
    assert!(sun.errors[0].contains("bubble"));
    // No dip: same altitude as the default sea-level sighting.
    assert_eq!(sun.corrected_altitude.to_string(), "44d59.1");
}

#[test]
fn unparsable_temperature_falls_back_to_the_default() {
    let record = SightingRecord {
        temperature: Some("warm".into()),
        ..sighting("Sun", "2024-01-01", "10:30:00", "45d0.0")
    };
    let (environment, warnings) = apply_defaults(&record, &Environment::default()).unwrap();
    assert_eq!(environment.temperature(), 72.0);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("warm"), "{}", warnings[0]);

    let reduction = reduce_sightings(&[record], &almanac(), &Environment::default()).unwrap();
    assert_eq!(reduction.diagnostics.error_count(), 0);
    let sun = &reduction.sightings[0];
    assert_eq!(sun.corrected_altitude.to_string(), "44d59.1");
    assert_eq!(sun.errors.len(), 1);
}

#[test]
fn unparsable_height_or_pressure_aborts() {
    let record = SightingRecord {
        pressure: Some("high".into()),
        ..sighting("Sun", "2024-01-01", "10:30:00", "45d0.0")
    };
    assert!(matches!(
        apply_defaults(&record, &Environment::default()),
        Err(Interrupt::AbortRun(SightError::InvalidInput(_)))
    ));

    let record = SightingRecord {
        height: Some("-4".into()),
        ..sighting("Sun", "2024-01-01", "10:30:00", "45d0.0")
    };
    assert!(matches!(
        apply_defaults(&record, &Environment::default()),
        Err(Interrupt::AbortRun(SightError::RangeViolation(_)))
    ));
}

#[test]
fn mandatory_tags_skip_rather_than_abort() {
    let record = SightingRecord::default();
    let interrupt = validate_mandatory(&record).unwrap_err();
    assert!(matches!(
        interrupt,
        Interrupt::SkipRecord(SightError::MissingMandatoryField("body"))
    ));
    assert_eq!(interrupt.error().to_string(), "body tag is missing");
}

#[test]
fn malformed_date_or_time_aborts() {
    assert!(matches!(
        parse_timestamp("2024-13-01", "10:00:00"),
        Err(Interrupt::AbortRun(SightError::InvalidInput(_)))
    ));
    assert!(matches!(
        parse_timestamp("2024-01-01", "10:00"),
        Err(Interrupt::AbortRun(SightError::InvalidInput(_)))
    ));
}

#[test]
fn seconds_into_hour_ignores_the_hour() {
    let timestamp = parse_timestamp("2024-01-01", "10:12:34").unwrap();
    assert_eq!(seconds_into_hour(&timestamp), 12 * 60 + 34);
}

#[test]
fn almanac_lookups_use_two_digit_year_dates() {
    let timestamp = parse_timestamp("2024-01-01", "10:30:00").unwrap();
    let star = resolve_star(&almanac(), "Betelgeuse", &timestamp).unwrap();
    assert_eq!(star.reference, "7d24.3");
    let bracket = resolve_aries(&almanac(), &timestamp).unwrap();
    assert_eq!(bracket.lower.to_string(), "45d0.0");

    let other_day = parse_timestamp("2025-01-01", "10:30:00").unwrap();
    assert!(matches!(
        resolve_star(&almanac(), "Betelgeuse", &other_day),
        Err(Interrupt::SkipRecord(SightError::AlmanacMismatch(_)))
    ));
}
