//! The eligibility oracle: may staff *s* work shift kind *t* on day *d*?
//!
//! Vacations and in-quarter birthdays are folded into per-staff absence sets
//! up front, so nothing downstream ever sees a forbidden (staff, day) pair
//! without asking here first.

use crate::model::shift::ShiftKind;
use crate::model::staff::{Role, Staff};
use crate::scheduler::calendar::QuarterCalendar;
use chrono::{Datelike, NaiveDate, Weekday};
use range_set_blaze::RangeSetBlaze;
use std::collections::{BTreeSet, HashMap};

/// Set of day indices inside the quarter.
pub type DaySet = RangeSetBlaze<u32>;

pub struct EligibilityOracle {
    /// Per staff index: days on which the person cannot be assigned anything.
    absences: Vec<DaySet>,
    weekdays: Vec<Weekday>,
}

impl EligibilityOracle {
    pub fn new(
        staff: &[Staff],
        calendar: &QuarterCalendar,
        vacations: &HashMap<Box<str>, BTreeSet<NaiveDate>>,
    ) -> Self {
        let weekdays = (0..calendar.day_count()).map(|d| calendar.weekday(d)).collect();
        let absences = staff
            .iter()
            .map(|s| {
                let mut set = DaySet::default();
                if let Some(days) = vacations.get(&s.id) {
                    for &date in days {
                        if let Some(idx) = calendar.day_index(date) {
                            set.insert(idx);
                        }
                    }
                }
                if let Some((month, day)) = s.birthday {
                    for d in 0..calendar.day_count() {
                        let date = calendar.date(d);
                        if date.month() == month && date.day() == day {
                            set.insert(d);
                        }
                    }
                }
                set
            })
            .collect();
        EligibilityOracle { absences, weekdays }
    }

    /// Days of the quarter on which the person is present at all.
    pub fn available_days(&self, staff_idx: usize) -> u32 {
        self.weekdays.len() as u32 - self.absences[staff_idx].iter().count() as u32
    }

    /// Pure conjunction of the eligibility rules.
    pub fn may_work(&self, staff_idx: usize, staff: &Staff, kind: ShiftKind, day: u32) -> bool {
        if self.absences[staff_idx].contains(day) {
            return false;
        }
        let weekday = self.weekdays[day as usize];

        if kind.is_night() {
            // The slot kind must be the one this weekday's night uses.
            return staff.nd_possible
                && kind == ShiftKind::night_for(weekday)
                && !staff.forbids_start(weekday);
        }

        // Daytime: interns never, minors not on Sundays.
        if staff.role == Role::Intern {
            return false;
        }
        if kind.is_saturday_day() && weekday != Weekday::Sat {
            return false;
        }
        if kind.is_sunday_day() && (weekday != Weekday::Sun || !staff.adult) {
            return false;
        }
        match kind {
            ShiftKind::Sa10_22 | ShiftKind::So8_20 | ShiftKind::So10_22 => staff.role == Role::Tfa,
            ShiftKind::Sa10_19 => staff.role == Role::Azubi,
            ShiftKind::So8_2030 => staff.role == Role::Azubi,
            ShiftKind::Sa10_21 => {
                staff.role == Role::Tfa || (staff.role == Role::Azubi && staff.reception)
            }
            _ => false,
        }
    }
}
