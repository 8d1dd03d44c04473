//! Aggregate figures about a journal, shown by the `stat` command.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::Result;

/// Summary counts over the whole journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JournalStats {
    pub note_count: usize,
    pub tag_count: usize,
    pub note_type_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Number of notes per year ("2010" → 2).
    pub notes_per_year: BTreeMap<String, usize>,
    /// Number of notes per note type; untyped notes are not counted.
    pub notes_per_type: BTreeMap<String, usize>,
    /// Most used tags, most frequent first, ties broken alphabetically.
    pub top_tags: Vec<(String, usize)>,
}

pub(crate) fn collect(conn: &Connection, top_tags: usize) -> Result<JournalStats> {
    let count = |sql: &str| -> rusqlite::Result<usize> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
    };

    let (first_date, last_date) = conn.query_row(
        "SELECT MIN(date), MAX(date) FROM notes",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(JournalStats {
        note_count: count("SELECT COUNT(*) FROM notes")?,
        tag_count: count("SELECT COUNT(*) FROM tags")?,
        note_type_count: count("SELECT COUNT(*) FROM note_types")?,
        first_date,
        last_date,
        notes_per_year: grouped(
            conn,
            "SELECT substr(date, 1, 4), COUNT(*) FROM notes GROUP BY 1",
        )?,
        notes_per_type: grouped(
            conn,
            "SELECT ty.label, COUNT(DISTINCT nnt.note_id)
               FROM note_note_types nnt JOIN note_types ty ON ty.id = nnt.type_id
              GROUP BY ty.label",
        )?,
        top_tags: most_used_tags(conn, top_tags)?,
    })
}

fn grouped(conn: &Connection, sql: &str) -> Result<BTreeMap<String, usize>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?
        .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
    Ok(rows)
}

fn most_used_tags(conn: &Connection, limit: usize) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT t.label, COUNT(nt.note_id) AS uses
           FROM tags t JOIN note_tags nt ON nt.tag_id = t.id
          GROUP BY t.id
          ORDER BY uses DESC, t.label
          LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

impl fmt::Display for JournalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dreams:     {}", self.note_count)?;
        writeln!(f, "tags:       {}", self.tag_count)?;
        writeln!(f, "dream types: {}", self.note_type_count)?;
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            writeln!(f, "period:     {first} → {last}")?;
        }
        if !self.notes_per_year.is_empty() {
            writeln!(f, "per year:")?;
            for (year, n) in &self.notes_per_year {
                writeln!(f, "  {year}: {n}")?;
            }
        }
        if !self.notes_per_type.is_empty() {
            writeln!(f, "per type:")?;
            for (label, n) in &self.notes_per_type {
                writeln!(f, "  {label}: {n}")?;
            }
        }
        if !self.top_tags.is_empty() {
            writeln!(f, "top tags:")?;
            for (label, n) in &self.top_tags {
                writeln!(f, "  {label}: {n}")?;
            }
        }
        Ok(())
    }
}
