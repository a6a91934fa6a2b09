use bon::Builder;
use itertools::Itertools;

use crate::{
    core::slot::{PriceSlot, SlotSeries},
    ops::Interval,
    prelude::*,
    quantity::rate::KilowattHourRate,
};

/// Picks the individually cheapest slots under the cheap threshold.
#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct EconomySelector<'a> {
    series: &'a SlotSeries,
    cheap_threshold: KilowattHourRate,

    /// Only slots starting within the range are considered, the whole series otherwise.
    range: Option<Interval>,

    max_slots: usize,
}

impl<S: economy_selector_builder::IsComplete> EconomySelectorBuilder<'_, S> {
    pub fn select(self) -> Vec<PriceSlot> {
        self.build().select()
    }
}

impl EconomySelector<'_> {
    /// Cheapest first, ties broken by the earlier start.
    #[instrument(skip_all, fields(cheap_threshold = %self.cheap_threshold, max_slots = self.max_slots))]
    fn select(self) -> Vec<PriceSlot> {
        let range = self.range;
        let selected = self
            .series
            .iter()
            .filter(|slot| slot.unit_cost <= self.cheap_threshold)
            .filter(|slot| range.is_none_or(|range| range.contains(slot.interval.start)))
            .sorted_by_key(|slot| (slot.unit_cost, slot.interval.start))
            .take(self.max_slots)
            .copied()
            .collect_vec();
        debug!(?range, n_selected = selected.len(), "selected economy slots");
        selected
    }
}
