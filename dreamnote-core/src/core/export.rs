//! Export of the whole journal as a single Markdown "dream book".

use std::io::Write;

use chrono::Datelike;
use log::info;

use crate::{Note, NoteStore, Result};

/// Title line of every exported book.
pub const BOOK_TITLE: &str = "# Dream book";

/// Renders `notes` as Markdown, one section per year and one entry per note.
///
/// Notes are expected in journal order (date, then creation time).
pub fn render_book(notes: &[Note]) -> String {
    let mut out = String::from(BOOK_TITLE);
    out.push('\n');

    let mut year = None;
    for note in notes {
        if year != Some(note.date.year()) {
            year = Some(note.date.year());
            out.push_str(&format!("\n## {}\n", note.date.year()));
        }
        out.push_str(&format!("\n### {} : {}\n", note.date, note.title));

        let mut meta = Vec::new();
        if let Some(ty) = &note.note_type {
            meta.push(format!("*{ty}*"));
        }
        if !note.tags.is_empty() {
            meta.push(format!("tags: {}", note.tags.join(", ")));
        }
        if !meta.is_empty() {
            out.push('\n');
            out.push_str(&meta.join(" | "));
            out.push('\n');
        }

        let body = note.body.trim_end();
        if !body.is_empty() {
            out.push('\n');
            out.push_str(body);
            out.push('\n');
        }
    }
    out
}

/// Writes the book for every note in `store` to `writer`. Returns the note count.
pub fn export_book<S, W>(store: &S, writer: &mut W) -> Result<usize>
where
    S: NoteStore + ?Sized,
    W: Write,
{
    let notes = store.list_all()?;
    writer.write_all(render_book(&notes).as_bytes())?;
    writer.flush()?;
    info!("exported {} dreams", notes.len());
    Ok(notes.len())
}
