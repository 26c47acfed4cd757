//! CLI command definitions
//!
//! All CLI structs and subcommand enums are defined here.

use clap::{Args, Parser, Subcommand, ValueEnum};
use mailbase::{ConflictPolicy, ListKind};
use std::path::PathBuf;

/// Mailbase - mailing-address database with bounce tracking
#[derive(Parser, Debug)]
#[command(name = "mailbase")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.config/mailbase/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// List file to operate on (default: the last file used)
    #[arg(short, long, global = true, env = "MAILBASE_FILE")]
    pub file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log loads, saves and conflict resolution to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Start a new, empty list file
    New {
        /// Where to create it (default: untitled.<ext> in the config directory)
        path: Option<PathBuf>,
    },

    /// Print addresses from one list, or all of them
    List {
        /// Which list to print (all lists if omitted)
        #[arg(value_enum)]
        list: Option<ListArg>,

        /// Print the list on one line, addresses joined by SEP (e.g. ", ")
        #[arg(short, long, value_name = "SEP", requires = "list")]
        separator: Option<String>,
    },

    /// Add addresses to a list
    Add {
        #[arg(value_enum)]
        list: ListArg,

        /// Addresses to add
        #[arg(required = true)]
        addresses: Vec<String>,

        #[command(flatten)]
        conflicts: ConflictArgs,
    },

    /// Delete addresses from a list
    Del {
        #[arg(value_enum)]
        list: ListArg,

        /// Addresses to delete
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Move addresses between the active and removed lists
    Move {
        /// Source list (active or removed)
        #[arg(value_enum)]
        from: ExclusiveListArg,

        /// Addresses to move
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Count one bounce for each address
    Bounce {
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Take back one bounce for each address
    Unbounce {
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Show the bounce count of an address
    Count { address: String },

    /// Move addresses bounced more than THRESHOLD times to the removed list
    Process {
        /// Bounce count to exceed (default from config)
        #[arg(short, long)]
        threshold: Option<u32>,
    },

    /// Replace the extracted list with addresses found in a text file
    Extract {
        /// Text file to scan, or '-' for stdin
        source: String,
    },

    /// File every extracted address into another list
    Triage {
        /// Destination list
        #[arg(value_enum)]
        target: TriageTarget,

        #[command(flatten)]
        conflicts: ConflictArgs,
    },

    /// Empty the extracted list
    ClearExtracted,

    /// Show list sizes and file status
    Stats,
}

/// How to resolve active/removed conflicts
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ConflictArgs {
    /// Move conflicting addresses out of the opposing list first
    #[arg(long, conflicts_with = "skip_conflicts")]
    pub force: bool,

    /// Leave conflicting addresses out and add the rest
    #[arg(long)]
    pub skip_conflicts: bool,
}

impl ConflictArgs {
    pub fn policy(self) -> ConflictPolicy {
        if self.force {
            ConflictPolicy::Force
        } else if self.skip_conflicts {
            ConflictPolicy::Skip
        } else {
            ConflictPolicy::Reject
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListArg {
    Active,
    Removed,
    Returned,
    Extracted,
}

impl From<ListArg> for ListKind {
    fn from(arg: ListArg) -> Self {
        match arg {
            ListArg::Active => ListKind::Active,
            ListArg::Removed => ListKind::Removed,
            ListArg::Returned => ListKind::Returned,
            ListArg::Extracted => ListKind::Extracted,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusiveListArg {
    Active,
    Removed,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageTarget {
    Active,
    Removed,
    Returned,
}

impl From<TriageTarget> for ListKind {
    fn from(target: TriageTarget) -> Self {
        match target {
            TriageTarget::Active => ListKind::Active,
            TriageTarget::Removed => ListKind::Removed,
            TriageTarget::Returned => ListKind::Returned,
        }
    }
}
