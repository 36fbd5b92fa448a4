use std::path::PathBuf;

use archiver_core::RunMode;
use clap::{ArgAction, Parser};

/// Archive every lesson of an online tutorial as HTML plus PDF or Markdown.
#[derive(Debug, Parser)]
#[command(name = "lesson-archiver", version)]
pub(crate) struct Cli {
    /// Directory that receives the archive (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Only write archival HTML
    #[arg(long, conflicts_with = "markdown")]
    pub nopdf: bool,

    /// Write Markdown instead of PDF next to the HTML
    #[arg(long)]
    pub markdown: bool,

    /// RON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of conversions running at once
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,

    /// Also write the log to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Mode selected by flags; `None` leaves the configured mode alone.
    pub fn mode(&self) -> Option<RunMode> {
        if self.nopdf {
            Some(RunMode::HtmlOnly)
        } else if self.markdown {
            Some(RunMode::HtmlMarkdown)
        } else {
            None
        }
    }
}
