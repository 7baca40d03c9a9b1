use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use econ_calendar::calendar::Importance;
use econ_calendar::ote::DEFAULT_THRESHOLD;

#[derive(Debug, Clone, Parser)]
#[clap(bin_name = env!("CARGO_PKG_NAME"), version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    /// Path to the configuration file
    #[clap(name = "config")]
    pub config: PathBuf,

    /// Print events as JSON
    #[clap(long, global = true)]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Extract the calendar if the held data is stale
    Refresh {
        /// Extract even if the data is still fresh
        #[clap(long)]
        force: bool,
    },
    /// Events of a single day, today if no date is given
    Day { date: Option<NaiveDate> },
    /// Events between two dates, both included
    Range {
        start: NaiveDate,
        end: NaiveDate,
        #[clap(flatten)]
        filter: Filter,
    },
    /// Events of the coming days, starting today
    Week {
        #[clap(long, default_value_t = 7)]
        days: u32,
        #[clap(flatten)]
        filter: Filter,
    },
    /// Optimal trade entry levels for a swing
    Ote {
        low: f64,
        high: f64,
        #[clap(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct Filter {
    /// Only events of this currency, e.g. USD
    #[clap(long)]
    pub currency: Option<String>,
    /// Comma separated importance levels, e.g. high,medium
    #[clap(long, value_delimiter = ',')]
    pub importance: Vec<Importance>,
}
