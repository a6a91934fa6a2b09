use std::fmt::{Display, Formatter};

use chrono::{DateTime, TimeDelta, TimeZone, Timelike};
use itertools::Itertools;

use crate::{core::window::Window, prelude::*};

/// Number of charging slots the inverter offers.
pub const N_SLOTS: usize = 6;

/// Registers per slot.
const N_SLOT_WORDS: usize = 3;

/// Slots per register bank.
const N_BANK_SLOTS: usize = 3;

/// Registers per bank.
pub const N_BANK_WORDS: usize = N_BANK_SLOTS * N_SLOT_WORDS;

/// Wall-clock time packed into a single register as `(hour << 8) | minute`.
#[derive(Copy, Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn from_date_time<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> Self {
        #[expect(clippy::cast_possible_truncation)]
        let (hour, minute) = (timestamp.hour() as u8, timestamp.minute() as u8);
        Self { hour, minute }
    }

    #[must_use]
    pub fn to_word(self) -> u16 {
        (u16::from(self.hour) << 8) | u16::from(self.minute)
    }

    pub const fn from_word(word: u16) -> Self {
        Self { hour: word.to_be_bytes()[0], minute: word.to_be_bytes()[1] }
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// One charging slot as the inverter stores it: start, end, and the enabled flag.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceScheduleSlot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub is_enabled: bool,
}

impl DeviceScheduleSlot {
    #[must_use]
    pub fn to_words(self) -> [u16; N_SLOT_WORDS] {
        [self.start.to_word(), self.end.to_word(), u16::from(self.is_enabled)]
    }

    pub const fn from_words(words: [u16; N_SLOT_WORDS]) -> Self {
        Self {
            start: TimeOfDay::from_word(words[0]),
            end: TimeOfDay::from_word(words[1]),
            is_enabled: words[2] != 0,
        }
    }
}

/// The full set of inverter charging slots, split into two register banks of three slots.
#[must_use]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceSchedule(pub [DeviceScheduleSlot; N_SLOTS]);

impl DeviceSchedule {
    /// Map the windows onto the device slots in chronological order, using the local wall-clock time.
    ///
    /// The device only has room for [`N_SLOTS`] windows, the later ones are dropped.
    pub fn from_windows<Tz: TimeZone>(windows: &[Window], time_zone: &Tz) -> Self {
        let windows = windows.iter().sorted_by_key(|window| window.interval.start).collect_vec();
        if windows.len() > N_SLOTS {
            warn!(
                n_windows = windows.len(),
                n_slots = N_SLOTS,
                "too many windows, the later ones will not be programmed"
            );
        }
        let windows = windows.into_iter().take(N_SLOTS).collect_vec();
        for window in windows.iter().filter(|window| window.duration() >= TimeDelta::days(1)) {
            warn!(
                start = %window.interval.start,
                duration = ?window.duration(),
                "the window lasts a whole day, its start and end times will coincide"
            );
        }
        if let Some(span) = clock_span(&windows).filter(|span| *span > TimeDelta::days(1)) {
            warn!(?span, "the windows span more than a day, some will fold onto the same times");
        }
        let mut schedule = Self::default();
        for (slot, window) in schedule.0.iter_mut().zip(windows) {
            *slot = DeviceScheduleSlot {
                start: TimeOfDay::from_date_time(&window.interval.start.with_timezone(time_zone)),
                end: TimeOfDay::from_date_time(&window.interval.end.with_timezone(time_zone)),
                is_enabled: true,
            };
        }
        schedule
    }

    pub fn enabled(&self) -> impl Iterator<Item = &DeviceScheduleSlot> {
        self.0.iter().filter(|slot| slot.is_enabled)
    }

    /// Register values of both banks.
    #[must_use]
    pub fn to_banks(&self) -> [[u16; N_BANK_WORDS]; 2] {
        let mut banks = [[0; N_BANK_WORDS]; 2];
        for (index, slot) in self.0.iter().enumerate() {
            let offset = (index % N_BANK_SLOTS) * N_SLOT_WORDS;
            banks[index / N_BANK_SLOTS][offset..offset + N_SLOT_WORDS]
                .copy_from_slice(&slot.to_words());
        }
        banks
    }

    pub fn from_banks(first: [u16; N_BANK_WORDS], second: [u16; N_BANK_WORDS]) -> Self {
        let mut schedule = Self::default();
        let words = first.into_iter().chain(second).tuples::<(u16, u16, u16)>();
        for (slot, (start, end, is_enabled)) in schedule.0.iter_mut().zip(words) {
            *slot = DeviceScheduleSlot::from_words([start, end, is_enabled]);
        }
        schedule
    }
}

/// Time from the earliest start to the latest end of the chronologically sorted windows.
fn clock_span(windows: &[&Window]) -> Option<TimeDelta> {
    let start = windows.first()?.interval.start;
    let end = windows.iter().map(|window| window.interval.end).max()?;
    Some(end - start)
}
