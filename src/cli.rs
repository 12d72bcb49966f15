use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mixsmith",
    about = "Compose weighted mixes from your streaming library",
    version
)]
pub struct Args {
    /// Bearer token for the catalog API
    #[arg(long, env = "MIXSMITH_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Engine config file (defaults to the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database holding cooldowns, links and blocks
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a mix and print it as JSON
    Generate {
        /// Run option id, see `options`
        #[arg(long, default_value = mixsmith::mix::recipe::DEFAULT_RECIPE_ID)]
        option: String,

        /// Number of tracks
        #[arg(long)]
        length: Option<usize>,

        /// 0 = calmer, 1 = more energetic
        #[arg(long)]
        calm_hype: Option<f64>,

        /// Share of the mix given to discovery tracks
        #[arg(long)]
        discover: Option<f64>,

        /// Crawl the artist's albums instead of using top tracks
        #[arg(long)]
        deep_cuts: bool,

        #[arg(long)]
        no_explicit: bool,

        /// Ignore the cooldown window for this run
        #[arg(long)]
        allow_repeats: bool,

        /// Fixed seed for a reproducible selection
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the cooldown history entirely
        #[arg(long)]
        offline: bool,
    },

    /// Link unlinked playlist and artist slots by name
    Resolve,

    /// List run options and catalog slots
    Options,

    /// Link a slot by hand from a URI, URL or bare id
    Link { slot: String, id: String },

    /// Replace the slots rap radio draws from
    RapSources {
        #[arg(required = true)]
        slots: Vec<String>,
    },

    /// Replace the similar-artist roster used by artist radio
    Similar {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Never serve this track again
    Block { track_id: String },

    /// Forget every recently served track
    ClearCooldown,
}
