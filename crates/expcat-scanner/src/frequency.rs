//! Frequency labels inferred from time-step spacing.

use expcat_types::{Calendar, CalendarDate, Frequency, FrequencyUnit};

const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Label a time axis from its decoded timestamps.
///
/// `bounds` is consulted only when there is a single timestamp: the cell
/// interval then stands in for the step.
pub fn detect_frequency(
    dates: &[CalendarDate],
    calendar: Calendar,
    bounds: Option<(CalendarDate, CalendarDate)>,
) -> Frequency {
    match dates {
        [] => Frequency::Static,
        [_] => match bounds {
            Some((lo, hi)) if lo < hi => classify(&[lo, hi], calendar),
            _ => Frequency::Static,
        },
        _ => classify(dates, calendar),
    }
}

fn classify(dates: &[CalendarDate], calendar: Calendar) -> Frequency {
    if let Some(months) = constant_month_step(dates, calendar) {
        return if months % 12 == 0 {
            Frequency::periodic((months / 12) as u32, FrequencyUnit::Yearly)
        } else {
            Frequency::periodic(months as u32, FrequencyUnit::Monthly)
        };
    }

    let Some(step) = constant_step_seconds(dates, calendar) else {
        return Frequency::Static;
    };
    if step % SECONDS_PER_DAY == 0 {
        Frequency::periodic((step / SECONDS_PER_DAY) as u32, FrequencyUnit::Daily)
    } else if step % SECONDS_PER_HOUR == 0 && step < SECONDS_PER_DAY {
        Frequency::periodic((step / SECONDS_PER_HOUR) as u32, FrequencyUnit::Hourly)
    } else {
        Frequency::Static
    }
}

/// Month count `m` when every step advances the calendar month by `m` and
/// either keeps day and time fixed or spans between `28m` and `31m` days.
fn constant_month_step(dates: &[CalendarDate], calendar: Calendar) -> Option<i64> {
    let m = dates[0].months_until(&dates[1]);
    if m <= 0 || m > u32::MAX as i64 {
        return None;
    }
    let lo = 28 * m * SECONDS_PER_DAY;
    let hi = 31 * m * SECONDS_PER_DAY;
    dates
        .windows(2)
        .all(|w| {
            let spacing = calendar.seconds_between(&w[0], &w[1]);
            w[0].months_until(&w[1]) == m
                && (w[0].same_day_and_time(&w[1]) || (lo..=hi).contains(&spacing))
        })
        .then_some(m)
}

fn constant_step_seconds(dates: &[CalendarDate], calendar: Calendar) -> Option<i64> {
    let step = calendar.seconds_between(&dates[0], &dates[1]);
    if step <= 0 || step / SECONDS_PER_HOUR > u32::MAX as i64 {
        return None;
    }
    dates
        .windows(2)
        .all(|w| calendar.seconds_between(&w[0], &w[1]) == step)
        .then_some(step)
}
