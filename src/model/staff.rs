use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three staff roles of the clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "TFA")]
    Tfa,
    Azubi,
    Intern,
}

impl Role {
    /// Default minimum length of a night block for the role.
    pub fn default_min_consecutive(&self) -> u8 {
        match self {
            Role::Azubi => 1,
            Role::Tfa | Role::Intern => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Station,
    Op,
    Other,
}

impl Department {
    /// Departments subject to the one-per-night and no-adjacent-nights rules.
    pub fn is_restricted(&self) -> bool {
        matches!(self, Department::Station | Department::Op)
    }
}

/// A staff member as provided by the caller. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: Box<str>,
    pub name: Box<str>,
    pub adult: bool,
    /// Contracted weekly hours, 1..=40.
    pub hours: u8,
    pub role: Role,
    pub department: Department,
    /// Whether an Azubi may cover the reception-capable Saturday slot.
    pub reception: bool,
    pub nd_possible: bool,
    /// true: must work regular nights solo. false: must be paired on regular nights.
    pub nd_alone: bool,
    pub nd_max_consecutive: Option<u8>,
    pub nd_min_consecutive: u8,
    /// Weekday ordinals (1=Mon..7=Sun) on which the person will not start a night.
    pub nd_exceptions: Box<[u8]>,
    /// Birthday as (month, day); the occurrence inside the quarter becomes an absence.
    pub birthday: Option<(u32, u32)>,
}

impl Staff {
    /// Whether the staff refuses to start a night on the given weekday.
    pub fn forbids_start(&self, weekday: Weekday) -> bool {
        let ordinal = weekday.number_from_monday() as u8;
        self.nd_exceptions.contains(&ordinal)
    }

    /// Number of distinct weekdays on which the person may start a night.
    pub fn allowed_start_weekdays(&self) -> u8 {
        let mut forbidden = [false; 8];
        for &o in self.nd_exceptions.iter() {
            if (1..=7).contains(&o) {
                forbidden[o as usize] = true;
            }
        }
        7 - forbidden[1..=7].iter().filter(|f| **f).count() as u8
    }
}

/// Builder applying the role defaults, following the crate's builder idiom.
pub struct StaffBuilder {
    id: Box<str>,
    name: Box<str>,
    adult: bool,
    hours: u8,
    role: Role,
    department: Department,
    reception: bool,
    nd_possible: bool,
    nd_alone: bool,
    nd_max_consecutive: Option<u8>,
    nd_min_consecutive: Option<u8>,
    nd_exceptions: Vec<u8>,
    birthday: Option<(u32, u32)>,
}

impl StaffBuilder {
    pub fn new(id: &str, name: &str) -> Self {
        StaffBuilder {
            id: id.into(),
            name: name.into(),
            adult: true,
            hours: 40,
            role: Role::Tfa,
            department: Department::Other,
            reception: false,
            nd_possible: true,
            nd_alone: false,
            nd_max_consecutive: None,
            nd_min_consecutive: None,
            nd_exceptions: Vec::new(),
            birthday: None,
        }
    }
    pub fn adult(mut self, adult: bool) -> Self {
        self.adult = adult;
        self
    }
    pub fn hours(mut self, hours: u8) -> Self {
        self.hours = hours;
        self
    }
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
    pub fn department(mut self, department: Department) -> Self {
        self.department = department;
        self
    }
    pub fn reception(mut self, reception: bool) -> Self {
        self.reception = reception;
        self
    }
    pub fn nd_possible(mut self, nd_possible: bool) -> Self {
        self.nd_possible = nd_possible;
        self
    }
    pub fn nd_alone(mut self, nd_alone: bool) -> Self {
        self.nd_alone = nd_alone;
        self
    }
    pub fn nd_max_consecutive(mut self, max: u8) -> Self {
        self.nd_max_consecutive = Some(max);
        self
    }
    pub fn nd_min_consecutive(mut self, min: u8) -> Self {
        self.nd_min_consecutive = Some(min);
        self
    }
    /// Adds a forbidden night-start weekday ordinal (1=Mon..7=Sun).
    pub fn nd_exception(mut self, ordinal: u8) -> Self {
        self.nd_exceptions.push(ordinal);
        self
    }
    pub fn nd_exceptions(mut self, ordinals: &[u8]) -> Self {
        self.nd_exceptions.extend_from_slice(ordinals);
        self
    }
    pub fn birthday(mut self, month: u32, day: u32) -> Self {
        self.birthday = Some((month, day));
        self
    }

    pub fn build(self) -> Staff {
        let min = self
            .nd_min_consecutive
            .unwrap_or(self.role.default_min_consecutive());
        Staff {
            id: self.id,
            name: self.name,
            adult: self.adult,
            hours: self.hours,
            role: self.role,
            department: self.department,
            reception: self.reception,
            nd_possible: self.nd_possible,
            nd_alone: self.nd_alone,
            nd_max_consecutive: self.nd_max_consecutive,
            nd_min_consecutive: min,
            nd_exceptions: self.nd_exceptions.into_boxed_slice(),
            birthday: self.birthday,
        }
    }
}

/// Structured rejection of invalid caller input, raised before any model is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("staff list is empty")]
    EmptyRoster,
    #[error("duplicate staff identifier `{id}`")]
    DuplicateStaffId { id: Box<str> },
    #[error("staff `{id}`: contracted hours {hours} outside 1..=40")]
    InvalidHours { id: Box<str>, hours: u8 },
    #[error("staff `{id}`: weekday ordinal {ordinal} outside 1..=7")]
    InvalidWeekdayOrdinal { id: Box<str>, ordinal: u8 },
    #[error("staff `{id}`: invalid birthday {month:02}-{day:02}")]
    InvalidBirthday { id: Box<str>, month: u32, day: u32 },
    #[error("staff `{id}`: minimum consecutive nights must be at least 1")]
    InvalidMinConsecutive { id: Box<str> },
    #[error("vacation entry references unknown staff `{id}`")]
    UnknownVacationStaff { id: Box<str> },
    #[error("quarter must start on Jan 1, Apr 1, Jul 1 or Oct 1, got {date}")]
    InvalidQuarterStart { date: NaiveDate },
}
