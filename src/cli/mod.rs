// CLI module
// This module provides the command-line interface

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scrub")]
#[command(about = "Allow-list HTML sanitizer for untrusted content", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sanitize markup from a file or stdin
    Clean {
        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Policy file to apply instead of the built-in default
        #[arg(short, long, env = "POLICY_PATH")]
        policy: Option<PathBuf>,

        /// Output file (writes stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Escape text so it renders as plain text, never as markup
    Escape {
        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Validate a policy file
    CheckPolicy {
        /// Policy file to validate
        path: PathBuf,
    },

    /// Print the effective policy
    ShowPolicy {
        /// Policy file (prints the built-in default when omitted)
        #[arg(short, long, env = "POLICY_PATH")]
        policy: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Yaml,
    Json,
}
