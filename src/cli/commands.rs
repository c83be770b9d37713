use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedgen")]
#[command(about = "Synthesize an article feed from a web page that has none")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a page and print its synthesized feed as JSON
    Generate {
        /// Page URL
        url: String,

        /// Maximum number of items (overrides FEEDGEN_MAX_ITEMS)
        #[arg(short, long)]
        max_items: Option<usize>,

        /// Decode obfuscated aggregator links in the items
        #[arg(long)]
        decode: bool,

        /// Print compact JSON on one line
        #[arg(long)]
        compact: bool,
    },

    /// List the native feeds a site already publishes, as JSON
    Detect {
        /// Page URL
        url: String,
    },

    /// Resolve a link found on a page into its canonical absolute URL
    Normalize {
        /// Raw link, possibly relative
        link: String,

        /// URL of the page the link was found on
        #[arg(short, long)]
        base: String,
    },

    /// Decode obfuscated aggregator URLs
    Decode {
        /// URLs to decode
        #[arg(required = true)]
        urls: Vec<String>,

        /// Enable decoding even if FEEDGEN_DECODE_ENABLED is off
        #[arg(long)]
        enable: bool,
    },

    /// List normalization rules in the order they are tried
    Rules,
}
