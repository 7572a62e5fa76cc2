//! Usage-rate estimation from measurement history

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::Measurement;

/// Average daily volume across the calendar days present in the history
///
/// Volume readings are cumulative within a day, so the largest reading of
/// each UTC day is that day's usage. Returns 0 for an empty history.
pub fn average_daily_volume(measurements: &[Measurement]) -> f64 {
    let daily = daily_peak_volume(measurements);
    if daily.is_empty() {
        return 0.0;
    }
    daily.values().sum::<f64>() / daily.len() as f64
}

/// Largest volume seen on each UTC calendar day
pub fn daily_peak_volume(measurements: &[Measurement]) -> BTreeMap<NaiveDate, f64> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for m in measurements.iter().filter(|m| m.volume.is_finite()) {
        daily
            .entry(m.timestamp.date_naive())
            .and_modify(|peak| *peak = peak.max(m.volume))
            .or_insert(m.volume);
    }
    daily
}

/// Whole days between the oldest and newest measurement, at least 1
pub fn history_span_days(measurements: &[Measurement]) -> i64 {
    let first = measurements.iter().map(|m| m.timestamp).min();
    let last = measurements.iter().map(|m| m.timestamp).max();
    match (first, last) {
        (Some(first), Some(last)) => (last - first).num_days().max(1),
        _ => 1,
    }
}
