use chrono::{NaiveDate, Weekday};
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The shift kinds of the duty plan. Saturday and Sunday daytime kinds exist
/// only on their weekday; exactly one night kind exists per date, selected by
/// the weekday on which the night begins.
///
/// The declaration order is the export row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShiftKind {
    #[serde(rename = "Sa_10-21")]
    Sa10_21,
    #[serde(rename = "Sa_10-22")]
    Sa10_22,
    #[serde(rename = "Sa_10-19")]
    Sa10_19,
    #[serde(rename = "So_8-20")]
    So8_20,
    #[serde(rename = "So_10-22")]
    So10_22,
    #[serde(rename = "So_8-20:30")]
    So8_2030,
    #[serde(rename = "N_So-Mo")]
    NSoMo,
    #[serde(rename = "N_Mo-Di")]
    NMoDi,
    #[serde(rename = "N_Di-Mi")]
    NDiMi,
    #[serde(rename = "N_Mi-Do")]
    NMiDo,
    #[serde(rename = "N_Do-Fr")]
    NDoFr,
    #[serde(rename = "N_Fr-Sa")]
    NFrSa,
    #[serde(rename = "N_Sa-So")]
    NSaSo,
}

pub const SATURDAY_KINDS: [ShiftKind; 3] = [ShiftKind::Sa10_21, ShiftKind::Sa10_22, ShiftKind::Sa10_19];
pub const SUNDAY_KINDS: [ShiftKind; 3] = [ShiftKind::So8_20, ShiftKind::So10_22, ShiftKind::So8_2030];

impl ShiftKind {
    pub fn is_night(&self) -> bool {
        matches!(
            self,
            ShiftKind::NSoMo
                | ShiftKind::NMoDi
                | ShiftKind::NDiMi
                | ShiftKind::NMiDo
                | ShiftKind::NDoFr
                | ShiftKind::NFrSa
                | ShiftKind::NSaSo
        )
    }
    pub fn is_saturday_day(&self) -> bool {
        matches!(self, ShiftKind::Sa10_21 | ShiftKind::Sa10_22 | ShiftKind::Sa10_19)
    }
    pub fn is_sunday_day(&self) -> bool {
        matches!(self, ShiftKind::So8_20 | ShiftKind::So10_22 | ShiftKind::So8_2030)
    }
    pub fn is_weekend_day(&self) -> bool {
        self.is_saturday_day() || self.is_sunday_day()
    }
    /// Nights where the on-site vet is not present; the lone-worker policies
    /// apply here. Sun→Mon and Mon→Tue are exempt.
    pub fn is_regular_night(&self) -> bool {
        self.is_night() && !matches!(self, ShiftKind::NSoMo | ShiftKind::NMoDi)
    }
    /// Nights attended by the on-site vet, with the one-non-Azubi capacity rule.
    pub fn is_vet_night(&self) -> bool {
        matches!(self, ShiftKind::NSoMo | ShiftKind::NMoDi)
    }

    /// The night kind beginning on the given weekday.
    pub fn night_for(weekday: Weekday) -> ShiftKind {
        match weekday {
            Weekday::Sun => ShiftKind::NSoMo,
            Weekday::Mon => ShiftKind::NMoDi,
            Weekday::Tue => ShiftKind::NDiMi,
            Weekday::Wed => ShiftKind::NMiDo,
            Weekday::Thu => ShiftKind::NDoFr,
            Weekday::Fri => ShiftKind::NFrSa,
            Weekday::Sat => ShiftKind::NSaSo,
        }
    }

    /// The weekday a night kind starts on; None for daytime kinds.
    pub fn start_weekday(&self) -> Option<Weekday> {
        match self {
            ShiftKind::NSoMo => Some(Weekday::Sun),
            ShiftKind::NMoDi => Some(Weekday::Mon),
            ShiftKind::NDiMi => Some(Weekday::Tue),
            ShiftKind::NMiDo => Some(Weekday::Wed),
            ShiftKind::NDoFr => Some(Weekday::Thu),
            ShiftKind::NFrSa => Some(Weekday::Fri),
            ShiftKind::NSaSo => Some(Weekday::Sat),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShiftKind::Sa10_21 => "Sa_10-21",
            ShiftKind::Sa10_22 => "Sa_10-22",
            ShiftKind::Sa10_19 => "Sa_10-19",
            ShiftKind::So8_20 => "So_8-20",
            ShiftKind::So10_22 => "So_10-22",
            ShiftKind::So8_2030 => "So_8-20:30",
            ShiftKind::NSoMo => "N_So-Mo",
            ShiftKind::NMoDi => "N_Mo-Di",
            ShiftKind::NDiMi => "N_Di-Mi",
            ShiftKind::NMiDo => "N_Mi-Do",
            ShiftKind::NDoFr => "N_Do-Fr",
            ShiftKind::NFrSa => "N_Fr-Sa",
            ShiftKind::NSaSo => "N_Sa-So",
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A slot that must be filled: a shift kind on a concrete date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShiftSlot {
    pub date: NaiveDate,
    pub kind: ShiftKind,
}

/// One staff member working one slot. `paired` is true exactly when the
/// night slot of that date holds two staff members; daytime assignments are
/// never paired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub staff_id: Box<str>,
    pub date: NaiveDate,
    pub kind: ShiftKind,
    pub paired: bool,
}

/// The full set of assignments for the quarter, ordered by (date, kind).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    assignments: Vec<Assignment>,
}

impl Schedule {
    pub fn new(mut assignments: Vec<Assignment>) -> Self {
        assignments.sort_by(|a, b| (a.date, a.kind, &a.staff_id).cmp(&(b.date, b.kind, &b.staff_id)));
        Schedule { assignments }
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }
    pub fn len(&self) -> usize {
        self.assignments.len()
    }
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Redundant date → kind → staff view of the assignment rows.
    pub fn slot_map(&self) -> BTreeMap<NaiveDate, BTreeMap<ShiftKind, Vec<Box<str>>>> {
        let mut map: BTreeMap<NaiveDate, BTreeMap<ShiftKind, Vec<Box<str>>>> = BTreeMap::new();
        for a in &self.assignments {
            map.entry(a.date)
                .or_default()
                .entry(a.kind)
                .or_default()
                .push(a.staff_id.clone());
        }
        map
    }

    pub fn staff_assignments<'a>(&'a self, staff_id: &'a str) -> impl Iterator<Item = &'a Assignment> {
        self.assignments.iter().filter(move |a| a.staff_id.as_ref() == staff_id)
    }

    /// Renders the roster as a printable table, one row per slot.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["date", "kind", "staff", "paired"]);
        for a in &self.assignments {
            table.add_row(row![
                a.date.to_string(),
                a.kind.label(),
                a.staff_id.as_ref(),
                if a.paired { "yes" } else { "" }
            ]);
        }
        table
    }
}
