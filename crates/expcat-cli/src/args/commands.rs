use clap::Subcommand;
use expcat_types::{CalendarDate, Frequency};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Scan archive roots and update the catalog")]
    Index {
        /// Archive roots; defaults to `roots` from the config file
        roots: Vec<PathBuf>,

        /// Re-scan files whose modification time is unchanged
        #[arg(long)]
        force: bool,

        /// Remove catalog records of files that no longer exist
        #[arg(long)]
        prune: bool,

        #[arg(long)]
        follow_symlinks: bool,

        /// Report every file, not just failures and the summary
        #[arg(long)]
        show_files: bool,
    },

    #[command(about = "List catalogued experiments")]
    Experiments {
        /// Only experiments tagged with this keyword
        #[arg(long)]
        keyword: Option<String>,
    },

    #[command(about = "Show one experiment with its metadata")]
    Show { experiment: String },

    #[command(about = "List metadata keywords")]
    Keywords,

    #[command(about = "List an experiment's files in time order")]
    Files { experiment: String },

    #[command(about = "List an experiment's variables")]
    Variables {
        experiment: String,

        #[arg(long)]
        frequency: Option<Frequency>,

        /// Include frequency, units, file count and coverage
        #[arg(long)]
        detail: bool,
    },

    #[command(about = "List output frequencies present in the catalog")]
    Frequencies {
        #[arg(long)]
        experiment: Option<String>,
    },

    #[command(about = "Show the files that hold a variable")]
    Resolve {
        experiment: String,
        variable: String,

        #[arg(long)]
        frequency: Option<Frequency>,
    },

    #[command(about = "Load a variable across its files")]
    Getvar {
        experiment: String,
        variable: String,

        #[arg(long)]
        frequency: Option<Frequency>,

        /// Keep steps at or after this date (YYYY[-MM[-DD[ HH:MM:SS]]])
        #[arg(long)]
        start: Option<CalendarDate>,

        /// Keep steps at or before this date
        #[arg(long)]
        end: Option<CalendarDate>,

        /// Use the first N files, or the last |N| when negative
        #[arg(short = 'n', long = "ncfiles", allow_negative_numbers = true)]
        n: Option<i64>,

        /// Add to raw time values, in the files' own time units
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<i64>,

        /// Chunk sizes, e.g. `time=12,yt=100`
        #[arg(long)]
        chunks: Option<String>,

        /// Read the data and report statistics
        #[arg(long)]
        compute: bool,
    },

    #[command(about = "Show catalog location and size")]
    Info,
}
