use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use feedgen::cli::{Cli, Commands};
use feedgen::config::SynthesisOptions;
use feedgen::decoder::UrlDecoder;
use feedgen::services::{HttpFetcher, SynthesisService};
use feedgen::NormalizerRegistry;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,feedgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let options = SynthesisOptions::from_env().context("loading configuration")?;

    match cli.command {
        Commands::Generate {
            url,
            max_items,
            decode,
            compact,
        } => cmd_generate(options, &url, max_items, decode, compact),
        Commands::Detect { url } => cmd_detect(options, &url),
        Commands::Normalize { link, base } => cmd_normalize(&link, &base),
        Commands::Decode { urls, enable } => cmd_decode(options, &urls, enable),
        Commands::Rules => cmd_rules(),
    }
}

fn cmd_generate(
    mut options: SynthesisOptions,
    url: &str,
    max_items: Option<usize>,
    decode: bool,
    compact: bool,
) -> anyhow::Result<()> {
    if let Some(max_items) = max_items {
        options.max_items = max_items;
    }
    if decode {
        options.decoder.decode_enabled = true;
    }

    let service = SynthesisService::from_options(options)?;
    let feed = service.generate(url)?;

    print_json(&feed, compact)
}

fn cmd_detect(options: SynthesisOptions, url: &str) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(&options.user_agent, options.fetch_timeout)?;
    let service = SynthesisService::new(fetcher, options);
    let feeds = service.detect_feeds(url)?;

    print_json(&feeds, false)
}

fn cmd_normalize(link: &str, base: &str) -> anyhow::Result<()> {
    let registry = NormalizerRegistry::new();
    let base = url::Url::parse(base).with_context(|| format!("invalid base URL '{}'", base))?;
    let normalized = registry.normalize_link(link, &base)?;

    print_json(&normalized, false)
}

fn cmd_decode(mut options: SynthesisOptions, urls: &[String], enable: bool) -> anyhow::Result<()> {
    if enable {
        options.decoder.decode_enabled = true;
    }

    // A disabled decoder still answers, with every URL unchanged
    let decoder = UrlDecoder::from_options(&options)
        .unwrap_or_else(|| UrlDecoder::new(options.decoder.clone()));
    let outcomes = decoder.decode_all(urls);

    print_json(&outcomes, false)?;

    if let Some(stats) = decoder.cache_stats() {
        tracing::debug!(
            hits = stats.hits,
            misses = stats.misses,
            size = stats.size,
            "Decode cache stats"
        );
    }

    Ok(())
}

fn cmd_rules() -> anyhow::Result<()> {
    let registry = NormalizerRegistry::new();

    for (i, id) in registry.rule_ids().iter().enumerate() {
        println!("{}. {}", i + 1, id);
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}
