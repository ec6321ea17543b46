use arteplus7::{
    ArteError, Category, Language, ResolvedStream, ResolverConfig, SourceEvent, StreamVariant,
    Video, VideoQuality, cache_root, clear_dir, config_path, init, init_logging, load_or_init,
    size_on_disk,
};
use clap::{Parser, Subcommand};
use dialoguer::Select;
use humansize::{DECIMAL, format_size};
use std::process;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Browse Arte+7 and resolve playable video streams
#[derive(Parser)]
#[command(name = "arteplus7", version, about)]
struct Cli {
    /// Catalog language (fr or de)
    #[arg(short, long, global = true)]
    language: Option<Language>,

    /// Preferred stream quality (low, medium, high, veryhigh, highest)
    #[arg(short, long, global = true)]
    quality: Option<VideoQuality>,

    /// Your country (two-letter code), hides geoblocked videos
    #[arg(long, global = true)]
    country: Option<String>,

    /// Do not read or write the on-disk cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the most recent videos
    Browse {
        /// Restrict to a category (code like DOR or name like Cinema)
        #[arg(short, long)]
        category: Option<Category>,

        /// Listing page to show
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Follow every listing page
        #[arg(long, conflicts_with = "page")]
        all: bool,

        /// Ignore cached listings
        #[arg(long)]
        refresh: bool,
    },

    /// Search titles and descriptions
    Search {
        /// Words that must all appear
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Resolve a program id or arte.tv URL to a stream URL
    Resolve {
        /// Program id (e.g. 074526-000-A) or video page URL
        target: String,

        /// Choose among all variants interactively
        #[arg(long)]
        pick: bool,
    },

    /// List the catalog categories
    Categories,

    /// Inspect or clear the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show the configuration file and effective settings
    Config,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache location and size
    Info,
    /// Delete every cached file
    Clear {
        /// Only drop cached listing pages, keep thumbnails
        #[arg(long)]
        listings: bool,
    },
    /// Delete thumbnails older than the given number of days
    Purge {
        #[arg(default_value_t = 30)]
        days: u64,
    },
}

/// Converts a day count from the command line, saturating on absurd values.
fn days_to_duration(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY))
}

/// Handles progress events and prints formatted output to stderr
fn handle_progress_event(event: SourceEvent) {
    match event {
        SourceEvent::FetchingListing { language, category } => match category {
            Some(category) => eprintln!("Fetching {} listing ({})...", category, language),
            None => eprintln!("Fetching listing ({})...", language),
        },
        SourceEvent::PageFetched { page, video_count } => {
            eprintln!("  page {}: {} video(s)", page, video_count);
        }
        SourceEvent::Complete { video_count } => {
            eprintln!("Found {} video(s)\n", video_count);
        }
    }
}

fn print_video(video: &Video) {
    println!("{}  {}", video.program_id, video.display_title());
    if let Some(duration) = video.duration {
        println!("    Duration: {} min", duration / 60);
    }
    if let Some(until) = video.available_until {
        println!("    Available until: {}", until.format("%Y-%m-%d %H:%M UTC"));
    }
    if !video.description.is_empty() {
        println!("    {}", video.description);
    }
}

fn describe_variant(variant: &StreamVariant) -> String {
    let mut text = format!(
        "{} {} {} [{}]",
        variant.protocol, variant.quality, variant.version_label, variant.version_code
    );
    if variant.width > 0 && variant.height > 0 {
        text.push_str(&format!(" {}x{}", variant.width, variant.height));
    }
    if variant.bitrate > 0 {
        text.push_str(&format!(" {} kbit/s", variant.bitrate));
    }
    text
}

fn print_stream(stream: &ResolvedStream, pick: bool) {
    println!("{} ({})", stream.video.title, stream.video.program_id);
    if let Some(until) = stream.video.available_until {
        println!("Available until: {}", until.format("%Y-%m-%d %H:%M UTC"));
    }

    let chosen = if pick {
        let variants: Vec<&StreamVariant> = std::iter::once(&stream.best)
            .chain(stream.alternatives.iter())
            .collect();
        let items: Vec<String> = variants.iter().map(|v| describe_variant(v)).collect();
        match Select::new()
            .with_prompt("Choose a stream")
            .items(&items)
            .default(0)
            .interact()
        {
            Ok(index) => variants[index],
            Err(e) => {
                eprintln!("Error: selection aborted: {}", e);
                process::exit(1);
            }
        }
    } else {
        &stream.best
    };

    println!("Stream: {}", describe_variant(chosen));
    println!("{}", chosen.url);
}

fn run(cli: Cli, mut config: ResolverConfig) -> Result<(), ArteError> {
    match cli.command {
        Command::Browse {
            category,
            page,
            all,
            refresh,
        } => {
            let source = init(config)?;
            if refresh {
                source.refresh(category);
            }

            let videos = if all {
                source.browse_all(category, handle_progress_event)?
            } else {
                let listing = source.browse(category, page)?;
                if let Some(next) = listing.next_page {
                    eprintln!("(more on page {})\n", next);
                }
                listing.videos
            };

            if videos.is_empty() {
                println!("No videos found.");
            }
            for video in &videos {
                print_video(video);
            }
        }
        Command::Search { terms } => {
            let source = init(config)?;
            let videos = source.search(&terms.join(" "))?;
            if videos.is_empty() {
                println!("No videos match '{}'.", terms.join(" "));
            }
            for video in &videos {
                print_video(video);
            }
        }
        Command::Resolve { target, pick } => {
            // Stream URLs carry expiring tokens, never persist them
            config.disk_cache = false;
            let source = init(config)?;
            let stream = source.resolve(&target)?;
            print_stream(&stream, pick);
        }
        Command::Categories => {
            for category in Category::ALL {
                println!("{}  {}", category.code(), category);
            }
        }
        Command::Cache { action } => {
            let root = cache_root()?;
            match action {
                CacheAction::Info => {
                    let source = init(config)?;
                    println!("Cache directory: {}", root.display());
                    println!("Size: {}", format_size(size_on_disk(&root), DECIMAL));
                    println!(
                        "Listings: {}",
                        format_size(source.listing_cache_size(), DECIMAL)
                    );
                }
                CacheAction::Clear { listings: true } => {
                    let source = init(config)?;
                    let removed = source.clear_listings()?;
                    println!("Removed {} cached listing page(s).", removed);
                }
                CacheAction::Clear { listings: false } => {
                    let removed = clear_dir(&root)?;
                    println!("Removed {} cached file(s).", removed);
                }
                CacheAction::Purge { days } => {
                    let source = init(config)?;
                    let removed = source.purge_thumbnails(days_to_duration(days));
                    println!("Removed {} thumbnail(s).", removed);
                }
            }
        }
        Command::Config => {
            println!("Configuration file: {}", config_path()?.display());
            match toml::to_string_pretty(&config) {
                Ok(text) => println!("\n{}", text),
                Err(e) => eprintln!("Error: cannot display configuration: {}", e),
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match load_or_init() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Command line flags override the configuration file
    if let Some(language) = cli.language {
        config.language = language;
    }
    if let Some(quality) = cli.quality {
        config.quality = quality;
    }
    if let Some(country) = &cli.country {
        config.country = Some(country.to_ascii_uppercase());
    }
    if cli.no_cache {
        config.disk_cache = false;
    }

    if let Err(e) = run(cli, config) {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}
