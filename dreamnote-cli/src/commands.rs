//! Subcommands that read the journal without starting the editor.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use dreamnote_core::{export_book, Journal};
use log::info;

use crate::error::Result;

/// Prints the dream tree, as an outline or as JSON.
pub fn browse<W: Write>(journal: &Journal, json: bool, out: &mut W) -> Result<()> {
    let tree = journal.date_tree()?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &tree)?;
        writeln!(out)?;
    } else if tree.is_empty() {
        writeln!(out, "No dreams yet.")?;
    } else {
        write!(out, "{}", tree.render())?;
    }
    Ok(())
}

/// Writes the Markdown book to `output`, or to `stdout` when no path is given.
pub fn book<W: Write>(journal: &Journal, output: Option<&Path>, stdout: &mut W) -> Result<usize> {
    let count = match output {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path)?);
            let count = export_book(journal, &mut file)?;
            info!("book written to {}", path.display());
            count
        }
        None => export_book(journal, stdout)?,
    };
    Ok(count)
}

pub fn stat<W: Write>(journal: &Journal, top: usize, out: &mut W) -> Result<()> {
    write!(out, "{}", journal.stats(top)?)?;
    Ok(())
}

/// Locks stdout for one of the commands above.
pub fn stdout() -> io::StdoutLock<'static> {
    io::stdout().lock()
}
