use average::Mean;
use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;

use crate::{ops::Interval, prelude::*, quantity::rate::KilowattHourRate};

/// One half-hour (normally) unit rate.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PriceSlot {
    pub interval: Interval,
    pub unit_cost: KilowattHourRate,
}

impl PriceSlot {
    pub const fn new(interval: Interval, unit_cost: KilowattHourRate) -> Self {
        Self { interval, unit_cost }
    }
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum MalformedSeriesError {
    #[error("slot starting at {start} does not end after its start")]
    NonPositiveDuration { start: DateTime<Utc> },

    #[error("slot starting at {start} lasts {actual} while the series uses {expected}")]
    InconsistentDuration { start: DateTime<Utc>, expected: TimeDelta, actual: TimeDelta },

    #[error("slot starting at {start} overlaps the previous slot")]
    Overlap { start: DateTime<Utc> },

    #[error("{gap} gap after the slot ending at {after}")]
    Gap { after: DateTime<Utc>, gap: TimeDelta },
}

/// Time-ordered unit rates with a fixed slot duration.
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotSeries {
    slots: Vec<PriceSlot>,
    slot_duration: TimeDelta,
}

impl SlotSeries {
    pub const DEFAULT_SLOT_DURATION: TimeDelta = TimeDelta::minutes(30);

    /// Sort the raw records by start time, drop repeated starts, and validate the result.
    ///
    /// The first record's duration becomes the nominal slot duration of the series.
    #[instrument(skip_all)]
    pub fn try_from_records(
        records: impl IntoIterator<Item = (Interval, KilowattHourRate)>,
    ) -> Result<Self, MalformedSeriesError> {
        let slots = records
            .into_iter()
            .map(|(interval, unit_cost)| PriceSlot::new(interval, unit_cost))
            .sorted_by_key(|slot| slot.interval.start)
            .dedup_by(|lhs, rhs| lhs.interval.start == rhs.interval.start)
            .collect_vec();

        if let Some(slot) = slots.iter().find(|slot| slot.interval.end <= slot.interval.start) {
            return Err(MalformedSeriesError::NonPositiveDuration { start: slot.interval.start });
        }

        let slot_duration = slots.first().map_or(Self::DEFAULT_SLOT_DURATION, |slot| slot.interval.len());
        if let Some(slot) = slots.iter().find(|slot| slot.interval.len() != slot_duration) {
            return Err(MalformedSeriesError::InconsistentDuration {
                start: slot.interval.start,
                expected: slot_duration,
                actual: slot.interval.len(),
            });
        }

        for (previous, next) in slots.iter().tuple_windows() {
            if next.interval.start < previous.interval.end {
                return Err(MalformedSeriesError::Overlap { start: next.interval.start });
            }
            let gap = next.interval.start - previous.interval.end;
            if gap > slot_duration * 2 {
                return Err(MalformedSeriesError::Gap { after: previous.interval.end, gap });
            }
        }

        debug!(len = slots.len(), ?slot_duration, "normalized the price series");
        Ok(Self { slots, slot_duration })
    }

    pub fn as_slice(&self) -> &[PriceSlot] {
        &self.slots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub const fn slot_duration(&self) -> TimeDelta {
        self.slot_duration
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSlot> {
        self.slots.iter()
    }

    /// Slots starting within the interval.
    pub fn starting_within(&self, interval: Interval) -> impl Iterator<Item = &PriceSlot> {
        self.slots.iter().filter(move |slot| interval.contains(slot.interval.start))
    }

    /// The slot which covers the timestamp, if any.
    #[must_use]
    pub fn slot_at(&self, timestamp: DateTime<Utc>) -> Option<&PriceSlot> {
        self.slots.iter().find(|slot| slot.interval.contains(timestamp))
    }

    #[must_use]
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.slots.last().map(|slot| slot.interval.end)
    }

    #[must_use]
    pub fn mean_cost(&self) -> Option<KilowattHourRate> {
        mean_cost(self.slots.iter().map(|slot| slot.unit_cost))
    }

    #[must_use]
    pub fn cheapest(&self) -> Option<&PriceSlot> {
        self.slots.iter().min_by_key(|slot| slot.unit_cost)
    }

    #[must_use]
    pub fn most_expensive(&self) -> Option<&PriceSlot> {
        self.slots.iter().max_by_key(|slot| slot.unit_cost)
    }
}

/// Arithmetic mean of the costs, [`None`] when there are none.
#[must_use]
pub fn mean_cost(costs: impl IntoIterator<Item = KilowattHourRate>) -> Option<KilowattHourRate> {
    let estimate: Mean = costs.into_iter().map(KilowattHourRate::into_inner).collect();
    if estimate.is_empty() { None } else { Some(KilowattHourRate::new(estimate.mean())) }
}

#[cfg(test)]
pub mod tests {
    use chrono::TimeZone;

    use super::*;

    /// Build contiguous half-hour slots starting at the given UTC time.
    pub fn series_at(start: DateTime<Utc>, costs: &[f64]) -> SlotSeries {
        let records = costs.iter().enumerate().map(|(index, cost)| {
            let start = start + SlotSeries::DEFAULT_SLOT_DURATION * i32::try_from(index).unwrap();
            (
                Interval::from_std(start..start + SlotSeries::DEFAULT_SLOT_DURATION),
                KilowattHourRate::new(*cost),
            )
        });
        SlotSeries::try_from_records(records).unwrap()
    }

    /// Midnight of the day the reference scenarios use.
    pub fn midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 28, 0, 0, 0).unwrap()
    }

    pub fn series(costs: &[f64]) -> SlotSeries {
        series_at(midnight(), costs)
    }

    fn record(hour: u32, minute: u32, cost: f64) -> (Interval, KilowattHourRate) {
        let start = midnight() + TimeDelta::hours(hour.into()) + TimeDelta::minutes(minute.into());
        (Interval::from_std(start..start + TimeDelta::minutes(30)), KilowattHourRate::new(cost))
    }

    #[test]
    fn test_reverse_chronological_records_are_sorted() {
        let series = SlotSeries::try_from_records([
            record(1, 0, 3.0),
            record(0, 30, 2.0),
            record(0, 0, 1.0),
        ])
        .unwrap();
        let costs = series.iter().map(|slot| slot.unit_cost.into_inner()).collect_vec();
        assert_eq!(costs, [1.0, 2.0, 3.0]);
        assert_eq!(series.slot_duration(), TimeDelta::minutes(30));
    }

    #[test]
    fn test_repeated_start_keeps_first_record() {
        let series =
            SlotSeries::try_from_records([record(0, 0, 1.0), record(0, 0, 5.0), record(0, 30, 2.0)])
                .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.as_slice()[0].unit_cost, KilowattHourRate::new(1.0));
    }

    #[test]
    fn test_single_missing_slot_is_tolerated() {
        let series = SlotSeries::try_from_records([record(0, 0, 1.0), record(1, 0, 2.0)]);
        assert!(series.is_ok());
    }

    #[test]
    fn test_gap_of_twice_the_duration_is_tolerated() {
        let series =
            SlotSeries::try_from_records([record(0, 0, 1.0), record(1, 30, 2.0)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.slot_duration(), TimeDelta::minutes(30));
    }

    #[test]
    fn test_large_gap_is_rejected() {
        let error = SlotSeries::try_from_records([record(0, 0, 1.0), record(2, 0, 2.0)])
            .unwrap_err();
        assert_eq!(
            error,
            MalformedSeriesError::Gap {
                after: midnight() + TimeDelta::minutes(30),
                gap: TimeDelta::minutes(90),
            }
        );
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        let start = midnight();
        let error = SlotSeries::try_from_records([(
            Interval::from_std(start..start),
            KilowattHourRate::new(1.0),
        )])
        .unwrap_err();
        assert_eq!(error, MalformedSeriesError::NonPositiveDuration { start });
    }

    #[test]
    fn test_inconsistent_duration_is_rejected() {
        let start = midnight() + TimeDelta::minutes(30);
        let result = SlotSeries::try_from_records([
            record(0, 0, 1.0),
            (Interval::from_std(start..start + TimeDelta::hours(1)), KilowattHourRate::new(1.0)),
        ]);
        assert!(matches!(result, Err(MalformedSeriesError::InconsistentDuration { .. })));
    }

    #[test]
    fn test_statistics() {
        let series = series(&[4.0, -1.0, 9.0, 8.0]);
        assert_eq!(series.mean_cost(), Some(KilowattHourRate::new(5.0)));
        assert_eq!(series.cheapest().unwrap().unit_cost, KilowattHourRate::new(-1.0));
        assert_eq!(series.most_expensive().unwrap().unit_cost, KilowattHourRate::new(9.0));
        assert_eq!(series.end(), Some(midnight() + TimeDelta::hours(2)));
    }

    #[test]
    fn test_empty_series() {
        let series = SlotSeries::try_from_records([]).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.mean_cost(), None);
    }
}
