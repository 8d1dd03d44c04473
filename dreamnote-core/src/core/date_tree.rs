//! Year → month → day navigation index over the journal.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::Datelike;
use serde::Serialize;

use crate::{Note, NoteStore, Result};

/// One note as listed under its day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub title: String,
    pub id: i64,
}

/// Day ("24") → notes of that day, in read order.
pub type DayMap = BTreeMap<String, Vec<TreeEntry>>;
/// Month ("05") → days.
pub type MonthMap = BTreeMap<String, DayMap>;

/// Notes grouped by year, month and day.
///
/// Keys are zero-padded strings so their lexical order is the calendar order.
/// A tree is always rebuilt from scratch; it is never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DateTree {
    years: BTreeMap<String, MonthMap>,
}

impl DateTree {
    /// Queries every note from `store` and groups them.
    pub fn build<S: NoteStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self::from_notes(&store.list_all()?))
    }

    /// Groups `notes`, which must already be ordered by date then creation time.
    pub fn from_notes(notes: &[Note]) -> Self {
        let mut years: BTreeMap<String, MonthMap> = BTreeMap::new();
        for note in notes {
            years
                .entry(format!("{:04}", note.date.year()))
                .or_default()
                .entry(format!("{:02}", note.date.month()))
                .or_default()
                .entry(format!("{:02}", note.date.day()))
                .or_default()
                .push(TreeEntry {
                    title: note.title.clone(),
                    id: note.id,
                });
        }
        Self { years }
    }

    pub fn years(&self) -> &BTreeMap<String, MonthMap> {
        &self.years
    }

    /// Returns the notes listed under one day, if any.
    pub fn day(&self, year: &str, month: &str, day: &str) -> Option<&[TreeEntry]> {
        self.years
            .get(year)?
            .get(month)?
            .get(day)
            .map(Vec::as_slice)
    }

    pub fn note_count(&self) -> usize {
        self.years
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Renders the tree as an indented outline, one note per line with its id.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (year, months) in &self.years {
            let _ = writeln!(out, "{year}");
            for (month, days) in months {
                let _ = writeln!(out, "  {month}");
                for (day, entries) in days {
                    let _ = writeln!(out, "    {day}");
                    for entry in entries {
                        let _ = writeln!(out, "      [{}] {}", entry.id, entry.title);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Journal, NoteDraft};
    use chrono::NaiveDate;

    fn note(id: i64, title: &str, y: i32, m: u32, d: u32) -> Note {
        Note {
            id,
            title: title.to_string(),
            body: String::new(),
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            created_at: id,
            modified_at: id,
            tags: vec![],
            note_type: None,
        }
    }

    #[test]
    fn test_consecutive_days_nest_under_one_month() {
        let tree = DateTree::from_notes(&[
            note(1, "reve1", 2020, 5, 24),
            note(2, "reve2", 2020, 5, 25),
        ]);

        assert_eq!(tree.years().len(), 1);
        let may = &tree.years()["2020"]["05"];
        assert_eq!(may.keys().collect::<Vec<_>>(), vec!["24", "25"]);
        assert_eq!(tree.day("2020", "05", "24").unwrap()[0].title, "reve1");
        assert_eq!(tree.day("2020", "05", "25").unwrap()[0].id, 2);
        assert_eq!(tree.note_count(), 2);
    }

    #[test]
    fn test_distinct_years_and_same_day_order() {
        let tree = DateTree::from_notes(&[
            note(3, "early", 2019, 12, 31),
            note(1, "first", 2020, 1, 1),
            note(2, "second", 2020, 1, 1),
        ]);

        assert_eq!(tree.years().keys().collect::<Vec<_>>(), vec!["2019", "2020"]);
        let titles: Vec<&str> = tree
            .day("2020", "01", "01")
            .unwrap()
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn test_build_from_store() {
        let mut journal = Journal::open_in_memory().unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2020, 5, day).unwrap();
        journal.create(&NoteDraft::new("b", d(25)).unwrap()).unwrap();
        journal.create(&NoteDraft::new("a", d(24)).unwrap()).unwrap();

        let tree = DateTree::build(&journal).unwrap();
        assert_eq!(tree.day("2020", "05", "24").unwrap()[0].title, "a");
        assert_eq!(tree.day("2020", "05", "25").unwrap()[0].title, "b");
    }

    #[test]
    fn test_render_and_json() {
        let tree = DateTree::from_notes(&[note(7, "reve", 2010, 5, 24)]);
        assert_eq!(tree.render(), "2010\n  05\n    24\n      [7] reve\n");

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["2010"]["05"]["24"][0]["id"], 7);
        assert!(DateTree::default().is_empty());
    }
}
