use expcat_types::*;

#[test]
fn test_monthly_axis_decodes_to_first_of_month_in_noleap() {
    let units: TimeUnits = "days since 1900-01-01 00:00:00".parse().unwrap();
    let month_starts = [0.0, 31.0, 59.0, 90.0, 120.0, 151.0, 181.0, 212.0, 243.0, 273.0, 304.0, 334.0, 365.0];

    let dates: Vec<CalendarDate> = month_starts
        .iter()
        .map(|v| units.decode(*v, Calendar::NoLeap).unwrap())
        .collect();

    for (i, date) in dates.iter().take(12).enumerate() {
        assert_eq!(*date, CalendarDate::ymd(1900, i as u32 + 1, 1));
    }
    assert_eq!(dates[12], CalendarDate::ymd(1901, 1, 1));
}

#[test]
fn test_model_years_far_before_common_epoch() {
    let units: TimeUnits = "days since 0001-01-01".parse().unwrap();
    let date = units.decode(-365.0 * 3000.0, Calendar::NoLeap).unwrap();
    assert_eq!(date, CalendarDate::ymd(-2999, 1, 1));
}

#[test]
fn test_offset_in_axis_units_shifts_by_whole_days() {
    let units: TimeUnits = "days since 1900-01-01".parse().unwrap();
    let base = units.decode(10.0, Calendar::ProlepticGregorian).unwrap();
    let shifted = units.decode(10.0 + 365.0, Calendar::ProlepticGregorian).unwrap();
    assert_eq!(
        Calendar::ProlepticGregorian.seconds_between(&base, &shifted),
        365 * 86_400
    );
}

#[test]
fn test_coverage_serializes_as_strings() {
    let coverage = TimeCoverage::new(CalendarDate::ymd(1951, 1, 1), CalendarDate::ymd(2000, 12, 1));
    let json = serde_json::to_value(coverage).unwrap();
    assert_eq!(json["start"], "1951-01-01 00:00:00");
    assert_eq!(json["end"], "2000-12-01 00:00:00");
}
