//! Relative volume pre-filter for single stocks
//!
//! Compares today's cumulative volume with the average full-day volume of
//! the previous sessions in the same multi-day fetch.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bars::Bar;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelativeVolumeConfig {
    /// Trading days fetched for the comparison (today included)
    pub lookback_days: u32,
    /// Minimum today / average-prior-day ratio to keep the stock
    pub threshold: f64,
}

impl Default for RelativeVolumeConfig {
    fn default() -> Self {
        Self {
            lookback_days: 5,
            threshold: 1.5,
        }
    }
}

/// Total volume per exchange-local date, oldest first
fn daily_volumes(bars: &[Bar], tz: Tz) -> BTreeMap<NaiveDate, u64> {
    let mut days = BTreeMap::new();
    for bar in bars {
        *days.entry(bar.session_date(tz)).or_insert(0u64) += bar.volume;
    }
    days
}

/// Today's volume over the mean of prior days, or None when there is no
/// usable comparison (no bars, no prior day, zero prior volume)
pub fn relative_volume(bars: &[Bar], tz: Tz) -> Option<f64> {
    let today = bars.last()?.session_date(tz);
    let days = daily_volumes(bars, tz);

    let today_vol = *days.get(&today)?;
    let past: Vec<u64> = days
        .iter()
        .filter(|(date, _)| **date < today)
        .map(|(_, vol)| *vol)
        .collect();
    if past.is_empty() {
        return None;
    }

    let avg = past.iter().sum::<u64>() as f64 / past.len() as f64;
    if avg == 0.0 {
        return None;
    }
    Some(today_vol as f64 / avg)
}

pub fn has_high_relative_volume(bars: &[Bar], tz: Tz, config: &RelativeVolumeConfig) -> bool {
    relative_volume(bars, tz).is_some_and(|rvol| rvol >= config.threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar_on(day: u32, hour: u32, volume: u64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume,
            complete: true,
        }
    }

    #[test]
    fn test_relative_volume_against_prior_days() {
        let tz = chrono_tz::Asia::Kolkata;
        let bars = vec![
            bar_on(3, 5, 1000),
            bar_on(3, 6, 1000),
            bar_on(4, 5, 3000),
            bar_on(4, 6, 1000),
            bar_on(5, 5, 5000),
        ];
        // prior days 2000 and 4000, today 5000
        let rvol = relative_volume(&bars, tz).unwrap();
        assert!((rvol - 5000.0 / 3000.0).abs() < 1e-9);
        assert!(has_high_relative_volume(&bars, tz, &RelativeVolumeConfig::default()));

        let strict = RelativeVolumeConfig {
            threshold: 2.0,
            ..Default::default()
        };
        assert!(!has_high_relative_volume(&bars, tz, &strict));
    }

    #[test]
    fn test_no_comparison_rejects() {
        let tz = chrono_tz::Asia::Kolkata;
        assert!(relative_volume(&[], tz).is_none());

        let today_only = vec![bar_on(5, 5, 5000)];
        assert!(!has_high_relative_volume(&today_only, tz, &RelativeVolumeConfig::default()));

        let zero_past = vec![bar_on(4, 5, 0), bar_on(5, 5, 5000)];
        assert!(relative_volume(&zero_past, tz).is_none());
    }
}
