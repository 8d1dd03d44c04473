use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Command line of the `dreamdtb` dream journal.
#[derive(Debug, Parser)]
#[clap(
    name = "dreamdtb",
    version,
    about = "Write down your dreams in your own editor"
)]
pub struct Cli {
    /// Path to the settings file
    #[clap(short = 'c', long, global = true, value_parser)]
    pub config: Option<PathBuf>,

    /// Path to the dream database
    #[clap(long, global = true, value_parser)]
    pub database: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// What to do; opens the editor when omitted
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a new dream in the editor
    Add {
        /// Title of the dream
        title: String,

        /// Night of the dream (YYYY-MM-DD), today by default
        #[clap(short, long)]
        date: Option<NaiveDate>,

        /// Kind of dream, e.g. "lucide"
        #[clap(short = 't', long = "type")]
        note_type: Option<String>,

        /// Tags to attach (comma-separated, repeatable)
        #[clap(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Open the editor, optionally on existing dreams
    Launch {
        /// Id of a dream to open (repeatable)
        #[clap(short, long = "open")]
        open: Vec<i64>,
    },

    /// Print the dream tree by year, month and day
    Browse {
        /// Output the tree as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Write every dream into one Markdown book
    Book {
        /// Output file, stdout when omitted
        #[clap(short, long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Print statistics about the journal
    Stat {
        /// How many tags to list
        #[clap(long, default_value_t = 5)]
        top: usize,
    },
}

impl Commands {
    /// True for the commands that hand the terminal over to the editor.
    pub fn uses_editor(&self) -> bool {
        matches!(self, Commands::Add { .. } | Commands::Launch { .. })
    }
}
