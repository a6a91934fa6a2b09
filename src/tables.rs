use chrono::{DateTime, Local, TimeDelta, Utc};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        plan::ChargePlan,
        schedule::DeviceSchedule,
        slot::SlotSeries,
        window::{RankedWindows, Window},
    },
    quantity::rate::KilowattHourRate,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn date_cell(timestamp: DateTime<Utc>) -> Cell {
    Cell::new(timestamp.with_timezone(&Local).format("%b %d")).add_attribute(Attribute::Dim)
}

fn time_cell(timestamp: DateTime<Utc>) -> Cell {
    Cell::new(timestamp.with_timezone(&Local).format("%H:%M"))
}

fn duration_cell(duration: TimeDelta) -> Cell {
    Cell::new(format!("{}h{:02}m", duration.num_hours(), duration.num_minutes() % 60))
        .set_alignment(CellAlignment::Right)
}

/// Green below the mean, red otherwise; the slots under the cheap threshold are bold.
pub fn build_prices_table(series: &SlotSeries, cheap_threshold: KilowattHourRate) -> Table {
    let mean_cost = series.mean_cost().unwrap_or(KilowattHourRate::ZERO);
    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "End", "Price"]);
    for slot in series.iter() {
        let mut cost = Cell::new(slot.unit_cost)
            .set_alignment(CellAlignment::Right)
            .fg(if slot.unit_cost < mean_cost { Color::Green } else { Color::Red });
        if slot.unit_cost <= cheap_threshold {
            cost = cost.add_attribute(Attribute::Bold);
        }
        table.add_row(vec![
            date_cell(slot.interval.start),
            time_cell(slot.interval.start),
            time_cell(slot.interval.end).add_attribute(Attribute::Dim),
            cost,
        ]);
    }
    table
}

pub fn build_price_statistics_table(series: &SlotSeries) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "Date", "Start", "Price"]);
    for (label, slot) in [("Minimum", series.cheapest()), ("Maximum", series.most_expensive())] {
        if let Some(slot) = slot {
            table.add_row(vec![
                Cell::new(label),
                date_cell(slot.interval.start),
                time_cell(slot.interval.start),
                Cell::new(slot.unit_cost).set_alignment(CellAlignment::Right),
            ]);
        }
    }
    if let Some(mean_cost) = series.mean_cost() {
        table.add_row(vec![
            Cell::new("Average"),
            Cell::new(""),
            Cell::new(""),
            Cell::new(mean_cost).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn add_window_row(table: &mut Table, window: &Window) {
    table.add_row(vec![
        date_cell(window.interval.start),
        time_cell(window.interval.start),
        time_cell(window.interval.end),
        duration_cell(window.duration()),
        Cell::new(window.mean_cost).set_alignment(CellAlignment::Right),
    ]);
}

pub fn build_ranked_windows_table(ranked: &RankedWindows) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "End", "Duration", "Mean price"]);
    for window in ranked.two_hours.iter().chain(&ranked.four_hours) {
        add_window_row(&mut table, window);
    }
    table
}

pub fn build_plan_table(plan: &ChargePlan) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "End", "Duration", "Mean price"]);
    for window in &plan.windows {
        add_window_row(&mut table, window);
    }
    table.add_row(vec![
        Cell::new(plan.outcome).add_attribute(Attribute::Bold),
        Cell::new(format!("→ {}", plan.target_state_of_charge)),
        Cell::new(""),
        duration_cell(plan.duration_total()),
        Cell::new(""),
    ]);
    table
}

/// Device times are local wall-clock times already.
pub fn build_device_schedule_table(schedule: &DeviceSchedule) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Start", "End", "Enabled"]);
    for (index, slot) in schedule.0.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).add_attribute(Attribute::Dim),
            Cell::new(slot.start),
            Cell::new(slot.end),
            if slot.is_enabled {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").add_attribute(Attribute::Dim)
            },
        ]);
    }
    table
}
