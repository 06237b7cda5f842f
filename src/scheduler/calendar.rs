/*
 * Copyright (c) 2025 Clément GRENNERAT
 *
 * This program is free software: you can redistribute it and/or modify it under the terms of the
 * GNU General Public License as published by the Free Software Foundation, version 3.
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
 * even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 * See the GNU General Public License for more details.
 * You should have received a copy of the GNU General Public License along with this program.
 * If not, see https://www.gnu.org/licenses/.
 *
 */

//! Quarter calendar: date arithmetic and enumeration of the slots to cover.

use crate::model::shift::{SATURDAY_KINDS, SUNDAY_KINDS, ShiftKind, ShiftSlot};
use crate::model::staff::InputError;
use chrono::{Datelike, Days, NaiveDate, Weekday};

/// The quarter horizon: consecutive days from the quarter start to the last
/// day of the third month, with day-index bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarterCalendar {
    start: NaiveDate,
    days: Vec<NaiveDate>,
}

impl QuarterCalendar {
    /// Builds the calendar for a quarter starting at `start`, which must be
    /// Jan 1, Apr 1, Jul 1 or Oct 1.
    pub fn new(start: NaiveDate) -> Result<Self, InputError> {
        if start.day() != 1 || !matches!(start.month(), 1 | 4 | 7 | 10) {
            return Err(InputError::InvalidQuarterStart { date: start });
        }
        let end_exclusive = if start.month() == 10 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 3, 1)
        }
        .expect("first day of a month is always a valid date");

        let mut days = Vec::new();
        let mut d = start;
        while d < end_exclusive {
            days.push(d);
            d = d + Days::new(1);
        }
        Ok(QuarterCalendar { start, days })
    }

    /// Truncated horizon for targeted tests; `solve` always uses full quarters.
    pub(crate) fn with_span(start: NaiveDate, day_count: u32) -> Self {
        let days = (0..day_count).map(|i| start + Days::new(i as u64)).collect();
        QuarterCalendar { start, days }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }
    pub fn day_count(&self) -> u32 {
        self.days.len() as u32
    }
    pub fn date(&self, day: u32) -> NaiveDate {
        self.days[day as usize]
    }
    pub fn weekday(&self, day: u32) -> Weekday {
        self.days[day as usize].weekday()
    }
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.day_index(date).is_some()
    }

    /// The day index of a date inside the quarter, if any.
    pub fn day_index(&self, date: NaiveDate) -> Option<u32> {
        if date < self.start {
            return None;
        }
        let idx = date.signed_duration_since(self.start).num_days() as usize;
        (idx < self.days.len()).then_some(idx as u32)
    }

    /// The night kind beginning on the given day.
    pub fn night_kind(&self, day: u32) -> ShiftKind {
        ShiftKind::night_for(self.weekday(day))
    }

    pub fn saturdays(&self) -> Vec<u32> {
        self.days_on(Weekday::Sat)
    }
    pub fn sundays(&self) -> Vec<u32> {
        self.days_on(Weekday::Sun)
    }
    fn days_on(&self, weekday: Weekday) -> Vec<u32> {
        (0..self.day_count()).filter(|&d| self.weekday(d) == weekday).collect()
    }

    /// All slots of the quarter, ordered by (date, kind): three Saturday
    /// daytime slots per Saturday, three Sunday daytime slots per Sunday, one
    /// night slot per date.
    pub fn slots(&self) -> Vec<ShiftSlot> {
        let mut slots = Vec::with_capacity(self.days.len() * 2);
        for (i, &date) in self.days.iter().enumerate() {
            match date.weekday() {
                Weekday::Sat => {
                    for kind in SATURDAY_KINDS {
                        slots.push(ShiftSlot { date, kind });
                    }
                }
                Weekday::Sun => {
                    for kind in SUNDAY_KINDS {
                        slots.push(ShiftSlot { date, kind });
                    }
                }
                _ => {}
            }
            slots.push(ShiftSlot {
                date,
                kind: self.night_kind(i as u32),
            });
        }
        slots
    }
}
