use crate::config::DEFAULT_SERVER;
use crate::model::NoteId;
use crate::storage::Theme;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "noteline", version, about = "Terminal client for a remote note list")]
pub struct Cli {
    /// Base URL of the notes service
    #[arg(long, global = true, env = "NOTELINE_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,
    /// Read the initial notes from a JSON file instead of the server
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,
    /// Verbose logging; RUST_LOG is honoured when set
    #[arg(long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the interactive TUI
    Tui,
    /// List notes
    List {
        /// Case-insensitive text filter
        #[arg(long, short = 'q')]
        query: Option<String>,
    },
    /// Add a new note
    Add {
        /// Note text
        text: String,
        /// Deadline in YYYY-MM-DDTHH:MM format
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Edit an existing note
    Edit {
        /// Note id to edit
        note_id: NoteId,
        /// New text
        #[arg(long)]
        text: Option<String>,
        /// New deadline (YYYY-MM-DDTHH:MM)
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<String>,
        /// Remove the deadline
        #[arg(long)]
        clear_deadline: bool,
    },
    /// Delete a note
    Delete {
        /// Note id to delete
        note_id: NoteId,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Print the note list as HTML markup
    Export {
        /// Case-insensitive text filter
        #[arg(long, short = 'q')]
        query: Option<String>,
    },
    /// Show or set the colour theme
    Theme {
        /// dark or light
        theme: Option<Theme>,
    },
}
