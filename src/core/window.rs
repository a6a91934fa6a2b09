use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;

use crate::{
    core::slot::{PriceSlot, SlotSeries, mean_cost},
    ops::Interval,
    prelude::*,
    quantity::rate::KilowattHourRate,
};

/// Contiguous stretch of slots with the mean unit cost over it.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Window {
    pub interval: Interval,
    pub mean_cost: KilowattHourRate,
}

impl Window {
    pub fn duration(self) -> TimeDelta {
        self.interval.len()
    }
}

impl From<PriceSlot> for Window {
    fn from(slot: PriceSlot) -> Self {
        Self { interval: slot.interval, mean_cost: slot.unit_cost }
    }
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedWindows {
    /// Non-overlapping 2-hour windows, cheapest first.
    pub two_hours: Vec<Window>,

    /// Non-overlapping 4-hour windows, cheapest first.
    pub four_hours: Vec<Window>,

    /// Mean unit cost over the entire series.
    pub mean_cost: Option<KilowattHourRate>,

    /// Cheapest 4-hour mean, capped by the configured ceiling.
    pub cheap_threshold: KilowattHourRate,
}

impl RankedWindows {
    /// Cheapest window of the duration which does not start before the timestamp.
    pub fn best_starting_after(&self, duration: TimeDelta, timestamp: DateTime<Utc>) -> Option<Window> {
        let windows = if duration <= TimeDelta::hours(2) { &self.two_hours } else { &self.four_hours };
        windows.iter().find(|window| window.interval.start >= timestamp).copied()
    }
}

/// Rank the fixed-length windows of the series.
#[instrument(skip_all)]
pub fn rank(series: &SlotSeries, cheap_ceiling: KilowattHourRate) -> RankedWindows {
    let mean_cost = series.mean_cost();
    let two_hours = rank_windows(series, TimeDelta::hours(2));
    let four_hours = rank_windows(series, TimeDelta::hours(4));
    let cheap_threshold =
        four_hours.first().map_or(cheap_ceiling, |window| window.mean_cost.min(cheap_ceiling));
    info!(
        n_two_hours = two_hours.len(),
        n_four_hours = four_hours.len(),
        ?mean_cost,
        %cheap_threshold,
        "ranked the windows"
    );
    RankedWindows { two_hours, four_hours, mean_cost, cheap_threshold }
}

/// Windows of the duration which are no worse than the series average, cheapest first,
/// with every window touching a cheaper one removed.
pub fn rank_windows(series: &SlotSeries, duration: TimeDelta) -> Vec<Window> {
    let Some(average) = series.mean_cost() else {
        return Vec::new();
    };
    let candidates = rolling_windows(series, duration)
        .filter(|window| window.mean_cost <= average)
        .sorted_by_key(|window| (window.mean_cost, window.interval.start))
        .collect_vec();
    remove_touching(&candidates)
}

/// Every complete window of the duration, one per slot where a full window ends.
///
/// A window ending at slot `i` covers the slots which start within `(start_i - duration, start_i]`,
/// and it is only complete when there are exactly as many of them as fit into the duration.
fn rolling_windows(series: &SlotSeries, duration: TimeDelta) -> impl Iterator<Item = Window> {
    let slots = series.as_slice();
    let n_slots = usize::try_from(duration.num_seconds() / series.slot_duration().num_seconds().max(1))
        .unwrap_or_default();
    (0..slots.len()).filter_map(move |index| {
        let last = slots[index];
        let members = slots[..=index]
            .iter()
            .rev()
            .take_while(|slot| slot.interval.start > last.interval.start - duration)
            .collect_vec();
        if n_slots == 0 || members.len() != n_slots {
            return None;
        }
        Some(Window {
            interval: Interval::from_std(last.interval.end - duration..last.interval.end),
            mean_cost: mean_cost(members.iter().map(|slot| slot.unit_cost))?,
        })
    })
}

/// Walk the ranked candidates and keep those which touch no candidate ranked ahead of them.
///
/// The check runs against the full candidate list, so a window displaced by a cheaper one
/// still displaces the windows behind it.
fn remove_touching(ranked: &[Window]) -> Vec<Window> {
    ranked
        .iter()
        .enumerate()
        .filter(|(index, window)| {
            !ranked[..*index].iter().any(|better| better.interval.touches(window.interval))
        })
        .map(|(_, window)| *window)
        .collect()
}
