use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sitefeed-cli")]
#[command(about = "Validate site definitions and render them to RSS")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check an SDD file and print a summary
    Validate {
        /// Path to the SDD JSON file
        sdd: PathBuf,
    },

    /// Run the extraction engine for an SDD
    Render {
        /// Path to the SDD JSON file
        sdd: PathBuf,

        /// Use this saved page instead of fetching the SDD url
        #[arg(long)]
        html: Option<PathBuf>,

        /// Write the result here (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the extracted item records as JSON instead of RSS
        #[arg(long)]
        records: bool,
    },
}
