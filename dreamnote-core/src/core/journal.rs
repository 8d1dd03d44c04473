//! Data access for notes, tags and note types over a Dream Note SQLite database.

use std::path::Path;

use chrono::NaiveDate;
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

use crate::core::error::is_constraint_violation;
use crate::core::note::normalise_labels;
use crate::{DateTree, DreamError, JournalStats, Note, NoteDraft, Result, Storage};

/// The persistence operations the buffer tracker and the date-tree indexer rely on.
pub trait NoteStore {
    /// Inserts a new note with its tags and type, returning the database id.
    ///
    /// # Errors
    ///
    /// Returns [`DreamError::Duplicate`] if a note with the same title already
    /// exists on the same date; nothing is written in that case.
    fn create(&mut self, draft: &NoteDraft) -> Result<i64>;

    /// Overwrites the note `id` with `draft`, reconciling tags and type.
    ///
    /// # Errors
    ///
    /// Returns [`DreamError::NotFound`] if no note has that id, or
    /// [`DreamError::Duplicate`] if the new title/date pair is taken.
    fn update(&mut self, id: i64, draft: &NoteDraft) -> Result<Note>;

    /// Fetches a single note by id.
    fn find_by_id(&self, id: i64) -> Result<Note>;

    /// Returns every note ordered by date, then creation time.
    fn list_all(&self) -> Result<Vec<Note>>;
}

/// A journal database: the notes table plus its tag and type label tables.
pub struct Journal {
    storage: Storage,
}

#[derive(Debug, Clone, Copy)]
enum Label {
    Tag,
    NoteType,
}

impl Label {
    fn table(self) -> &'static str {
        match self {
            Label::Tag => "tags",
            Label::NoteType => "note_types",
        }
    }
}

/// Shared column list: the note row plus its tags (unit-separator joined) and first type.
const NOTE_SELECT: &str = "SELECT n.id, n.title, n.body, n.date, n.created_at, n.modified_at,
        (SELECT GROUP_CONCAT(t.label, char(31))
           FROM note_tags nt JOIN tags t ON t.id = nt.tag_id
          WHERE nt.note_id = n.id) AS tags,
        (SELECT ty.label
           FROM note_note_types nnt JOIN note_types ty ON ty.id = nnt.type_id
          WHERE nnt.note_id = n.id
          ORDER BY nnt.rowid LIMIT 1) AS note_type
   FROM notes n";

type NoteRow = (i64, String, String, NaiveDate, i64, i64, Option<String>, Option<String>);

impl Journal {
    /// Opens (or creates) the journal database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(path)?,
        })
    }

    /// Opens a throwaway journal held entirely in memory.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            storage: Storage::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    /// Creates the tag `label` if it does not exist yet and returns its id.
    pub fn create_tag(&mut self, label: &str) -> Result<i64> {
        upsert_label(self.storage.connection(), Label::Tag, label)
    }

    /// Creates the note type `label` if it does not exist yet and returns its id.
    pub fn create_note_type(&mut self, label: &str) -> Result<i64> {
        upsert_label(self.storage.connection(), Label::NoteType, label)
    }

    /// Returns every known tag label, sorted alphabetically.
    pub fn list_tags(&self) -> Result<Vec<String>> {
        list_labels(self.connection(), Label::Tag)
    }

    /// Returns every known note type label, sorted alphabetically.
    pub fn list_note_types(&self) -> Result<Vec<String>> {
        list_labels(self.connection(), Label::NoteType)
    }

    /// Summarises the journal contents; `top_tags` bounds the most-used tag list.
    pub fn stats(&self, top_tags: usize) -> Result<JournalStats> {
        crate::core::stats::collect(self.connection(), top_tags)
    }

    /// Rebuilds the navigation tree from the current database state.
    pub fn date_tree(&self) -> Result<DateTree> {
        DateTree::build(self)
    }
}

impl NoteStore for Journal {
    fn create(&mut self, draft: &NoteDraft) -> Result<i64> {
        let tags = normalise_labels(draft.tags.iter().cloned());
        let now = chrono::Utc::now().timestamp();
        let tx = self.storage.connection_mut().transaction()?;

        if let Err(e) = tx.execute(
            "INSERT INTO notes (title, body, date, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![draft.title, draft.body, draft.date, now],
        ) {
            return Err(duplicate_or(e, draft));
        }
        let id = tx.last_insert_rowid();

        for tag in &tags {
            attach_tag(&tx, id, tag)?;
        }
        if let Some(note_type) = trimmed(&draft.note_type) {
            attach_note_type(&tx, id, note_type)?;
        }

        tx.commit()?;
        info!("dream {id} created: '{}' on {}", draft.title, draft.date);
        Ok(id)
    }

    fn update(&mut self, id: i64, draft: &NoteDraft) -> Result<Note> {
        let previous = self.find_by_id(id)?;
        let tags = normalise_labels(draft.tags.iter().cloned());
        let note_type = trimmed(&draft.note_type).map(str::to_string);
        let now = chrono::Utc::now().timestamp();

        let tx = self.storage.connection_mut().transaction()?;
        match tx.execute(
            "UPDATE notes SET title = ?1, body = ?2, date = ?3, modified_at = ?4 WHERE id = ?5",
            rusqlite::params![draft.title, draft.body, draft.date, now, id],
        ) {
            Err(e) => return Err(duplicate_or(e, draft)),
            Ok(0) => return Err(DreamError::NotFound(id)),
            Ok(_) => {}
        }

        for removed in previous.tags.iter().filter(|t| !tags.contains(t)) {
            detach_tag(&tx, id, removed)?;
        }
        for added in tags.iter().filter(|t| !previous.tags.contains(t)) {
            attach_tag(&tx, id, added)?;
        }
        if previous.note_type != note_type {
            tx.execute("DELETE FROM note_note_types WHERE note_id = ?1", [id])?;
            if let Some(note_type) = &note_type {
                attach_note_type(&tx, id, note_type)?;
            }
        }

        tx.commit()?;
        info!("dream {id} updated");
        self.find_by_id(id)
    }

    fn find_by_id(&self, id: i64) -> Result<Note> {
        debug!("find by id: {id}");
        let sql = format!("{NOTE_SELECT} WHERE n.id = ?1");
        let row = self
            .connection()
            .query_row(&sql, [id], map_note_row)
            .optional()?;
        match row {
            Some(row) => Ok(note_from_row(row)),
            None => {
                info!("find by id: no dream {id}");
                Err(DreamError::NotFound(id))
            }
        }
    }

    fn list_all(&self) -> Result<Vec<Note>> {
        let sql = format!("{NOTE_SELECT} ORDER BY n.date, n.created_at, n.id");
        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt
            .query_map([], map_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().map(note_from_row).collect())
    }
}

/// Maps a unique-constraint failure on the notes table to [`DreamError::Duplicate`].
fn duplicate_or(err: rusqlite::Error, draft: &NoteDraft) -> DreamError {
    if is_constraint_violation(&err) {
        info!("duplicate dream: '{}' on {}", draft.title, draft.date);
        DreamError::Duplicate {
            title: draft.title.clone(),
            date: draft.date,
        }
    } else {
        DreamError::Database(err)
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn upsert_label(conn: &Connection, kind: Label, label: &str) -> Result<i64> {
    let table = kind.table();
    let inserted = conn.execute(
        &format!("INSERT OR IGNORE INTO {table} (label) VALUES (?1)"),
        [label],
    )?;
    if inserted == 0 {
        debug!("duplicate {table} label: {label}");
    }
    let id = conn.query_row(
        &format!("SELECT id FROM {table} WHERE label = ?1"),
        [label],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn list_labels(conn: &Connection, kind: Label) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("SELECT label FROM {} ORDER BY label", kind.table()))?;
    let labels = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(labels)
}

fn attach_tag(conn: &Connection, note_id: i64, label: &str) -> Result<()> {
    let tag_id = upsert_label(conn, Label::Tag, label)?;
    conn.execute(
        "INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?1, ?2)",
        [note_id, tag_id],
    )?;
    Ok(())
}

fn detach_tag(conn: &Connection, note_id: i64, label: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM note_tags
         WHERE note_id = ?1 AND tag_id IN (SELECT id FROM tags WHERE label = ?2)",
        rusqlite::params![note_id, label],
    )?;
    Ok(())
}

fn attach_note_type(conn: &Connection, note_id: i64, label: &str) -> Result<()> {
    let type_id = upsert_label(conn, Label::NoteType, label)?;
    conn.execute(
        "INSERT OR IGNORE INTO note_note_types (note_id, type_id) VALUES (?1, ?2)",
        [note_id, type_id],
    )?;
    Ok(())
}

fn map_note_row(row: &rusqlite::Row) -> rusqlite::Result<NoteRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn note_from_row(
    (id, title, body, date, created_at, modified_at, tags, note_type): NoteRow,
) -> Note {
    let mut tags: Vec<String> = tags
        .unwrap_or_default()
        .split('\u{1f}')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    tags.sort();
    Note {
        id,
        title,
        body,
        date,
        created_at,
        modified_at,
        tags,
        note_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(title: &str, d: NaiveDate) -> NoteDraft {
        NoteDraft::new(title, d).unwrap()
    }

    #[test]
    fn test_create_and_find_by_id() {
        let temp = NamedTempFile::new().unwrap();
        let mut journal = Journal::open(temp.path()).unwrap();

        let id = journal
            .create(
                &draft("reve1", date(2010, 5, 24))
                    .with_body("je vais à la piscine")
                    .with_tags(["piscine", "eau"])
                    .with_note_type("normal"),
            )
            .unwrap();

        let note = journal.find_by_id(id).unwrap();
        assert_eq!(note.title, "reve1");
        assert_eq!(note.body, "je vais à la piscine");
        assert_eq!(note.date, date(2010, 5, 24));
        assert_eq!(note.tags, vec!["eau", "piscine"]);
        assert_eq!(note.note_type.as_deref(), Some("normal"));
    }

    #[test]
    fn test_create_duplicate_title_and_date() {
        let mut journal = Journal::open_in_memory().unwrap();
        journal
            .create(&draft("reve1", date(2010, 5, 24)).with_tags(["a"]))
            .unwrap();

        let second = journal.create(&draft("reve1", date(2010, 5, 24)).with_tags(["b"]));
        assert!(matches!(second, Err(DreamError::Duplicate { .. })));

        let count: i64 = journal
            .connection()
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        // The rejected insert attached nothing.
        assert_eq!(journal.list_tags().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_same_title_on_another_day_is_allowed() {
        let mut journal = Journal::open_in_memory().unwrap();
        journal.create(&draft("reve", date(2010, 5, 24))).unwrap();
        journal.create(&draft("reve", date(2010, 5, 25))).unwrap();
        assert_eq!(journal.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_update_converges_on_requested_tags() {
        let mut journal = Journal::open_in_memory().unwrap();
        let base = draft("reve1", date(2010, 5, 24));
        let id = journal.create(&base.clone().with_tags(["a", "b"])).unwrap();

        let sequences: [&[&str]; 5] = [
            &["b", "c"],
            &[],
            &["c", "c", "a"],
            &["a"],
            &["d", "b", "a"],
        ];
        for requested in sequences {
            let note = journal
                .update(id, &base.clone().with_tags(requested.iter().copied()))
                .unwrap();
            let mut expected: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
            expected.sort();
            expected.dedup();
            assert_eq!(note.tags, expected);
        }

        // Labels stay in the tag table after being detached.
        assert_eq!(journal.list_tags().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_update_replaces_type_only_when_changed() {
        let mut journal = Journal::open_in_memory().unwrap();
        let base = draft("reve1", date(2010, 5, 24));
        let id = journal.create(&base.clone().with_note_type("normal")).unwrap();

        let note = journal.update(id, &base.clone().with_note_type("normal")).unwrap();
        assert_eq!(note.note_type.as_deref(), Some("normal"));

        let note = journal.update(id, &base.clone().with_note_type("lucide")).unwrap();
        assert_eq!(note.note_type.as_deref(), Some("lucide"));
        let links: i64 = journal
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM note_note_types WHERE note_id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(links, 1);

        let note = journal.update(id, &base).unwrap();
        assert_eq!(note.note_type, None);
    }

    #[test]
    fn test_update_overwrites_fields() {
        let mut journal = Journal::open_in_memory().unwrap();
        let id = journal.create(&draft("reve1", date(2010, 5, 24))).unwrap();

        let note = journal
            .update(id, &draft("reve1 bis", date(2010, 5, 26)).with_body("la suite"))
            .unwrap();
        assert_eq!(note.title, "reve1 bis");
        assert_eq!(note.date, date(2010, 5, 26));
        assert_eq!(note.body, "la suite");
        assert!(note.modified_at >= note.created_at);
    }

    #[test]
    fn test_update_not_found() {
        let mut journal = Journal::open_in_memory().unwrap();
        let result = journal.update(42, &draft("reve1", date(2010, 5, 24)));
        assert!(matches!(result, Err(DreamError::NotFound(42))));
    }

    #[test]
    fn test_update_into_existing_title_and_date_is_duplicate() {
        let mut journal = Journal::open_in_memory().unwrap();
        journal.create(&draft("reve1", date(2010, 5, 24))).unwrap();
        let id = journal
            .create(&draft("reve2", date(2010, 5, 24)).with_tags(["x"]))
            .unwrap();

        let result = journal.update(id, &draft("reve1", date(2010, 5, 24)));
        assert!(matches!(result, Err(DreamError::Duplicate { .. })));
        let unchanged = journal.find_by_id(id).unwrap();
        assert_eq!(unchanged.title, "reve2");
        assert_eq!(unchanged.tags, vec!["x"]);
    }

    #[test]
    fn test_find_by_id_not_found() {
        let journal = Journal::open_in_memory().unwrap();
        assert!(matches!(journal.find_by_id(1), Err(DreamError::NotFound(1))));
    }

    #[test]
    fn test_list_all_orders_by_date_then_creation() {
        let mut journal = Journal::open_in_memory().unwrap();
        journal.create(&draft("late", date(2011, 1, 1))).unwrap();
        journal.create(&draft("b", date(2010, 5, 24))).unwrap();
        journal.create(&draft("a", date(2010, 5, 24))).unwrap();

        let titles: Vec<String> = journal
            .list_all()
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["b", "a", "late"]);
    }

    #[test]
    fn test_label_creation_is_idempotent() {
        let mut journal = Journal::open_in_memory().unwrap();
        let first = journal.create_tag("eau").unwrap();
        let second = journal.create_tag("eau").unwrap();
        assert_eq!(first, second);

        journal.create_note_type("normal").unwrap();
        journal.create_note_type("lucide").unwrap();
        journal.create_note_type("normal").unwrap();
        assert_eq!(journal.list_note_types().unwrap(), vec!["lucide", "normal"]);
    }

    #[test]
    fn test_tags_with_commas_round_trip() {
        let mut journal = Journal::open_in_memory().unwrap();
        let id = journal
            .create(&draft("reve1", date(2010, 5, 24)).with_tags(["mer, plage", "ciel"]))
            .unwrap();
        let note = journal.find_by_id(id).unwrap();
        assert_eq!(note.tags, vec!["ciel", "mer, plage"]);
    }
}
