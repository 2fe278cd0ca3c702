use anyhow::{bail, Context, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use shutter::albums::sort_for_display;
use shutter::config::Config;
use shutter::index::SqliteMediaIndex;
use shutter::logging;
use shutter::models::{Album, Media};
use shutter::scanner::Scanner;
use shutter::{MediaRepository, PagerEvent};

enum Command {
    Scan(PathBuf),
    Albums,
    Media { album: Option<i32>, page: usize },
    Watch { scan: Option<PathBuf>, interval: u64 },
    Mutate { id: i64, mutation: Mutation },
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Favorite(bool),
    Trash(bool),
    Delete,
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut album = None;
    let mut page = 1;
    let mut scan = None;
    let mut interval = 5;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("shutter {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(value_of(&args, i, "--config")));
                i += 1;
            }
            "--album" | "-a" => {
                album = Some(parse_number(value_of(&args, i, "--album"), "--album"));
                i += 1;
            }
            "--page" | "-p" => {
                page = parse_number(value_of(&args, i, "--page"), "--page");
                i += 1;
            }
            "--scan" => {
                scan = Some(PathBuf::from(value_of(&args, i, "--scan")));
                i += 1;
            }
            "--interval" => {
                interval = parse_number(value_of(&args, i, "--interval"), "--interval");
                i += 1;
            }
            arg if arg.starts_with('-') && arg.parse::<i64>().is_err() => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let mutation_of = |mutation: Mutation| -> Command {
        match positional.get(1) {
            Some(value) => Command::Mutate {
                id: parse_number(value, "ID"),
                mutation,
            },
            None => {
                eprintln!("Error: {} requires a media ID", positional[0]);
                std::process::exit(1);
            }
        }
    };

    let command = match positional.first().map(String::as_str) {
        Some("scan") => match positional.get(1) {
            Some(dir) => Command::Scan(PathBuf::from(dir)),
            None => {
                eprintln!("Error: scan requires a directory argument");
                std::process::exit(1);
            }
        },
        Some("albums") | None => Command::Albums,
        Some("media") => Command::Media {
            album,
            page: page.max(1),
        },
        Some("watch") => Command::Watch { scan, interval },
        Some("favorite") => mutation_of(Mutation::Favorite(true)),
        Some("unfavorite") => mutation_of(Mutation::Favorite(false)),
        Some("trash") => mutation_of(Mutation::Trash(true)),
        Some("restore") => mutation_of(Mutation::Trash(false)),
        Some("delete") => mutation_of(Mutation::Delete),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    };

    Args {
        config_path,
        command,
    }
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires an argument", flag);
            std::process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> T {
    match value.parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("Error: {} expects a number, got {:?}", what, value);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"shutter - photo and video gallery index

USAGE:
    shutter [OPTIONS] [COMMAND]

COMMANDS:
    scan DIR                    Index images and videos under DIR, dropping
                                entries whose file is gone
    albums                      List albums (default)
    media [--album ID] [--page N]
                                List one page of an album's media, newest first
    watch [--scan DIR] [--interval SECS]
                                Print the album list whenever it changes,
                                optionally rescanning DIR every SECS seconds
    favorite ID | unfavorite ID Mark or unmark a media item as favorite
    trash ID | restore ID       Move a media item to or out of the trash
    delete ID                   Remove a media item from the index

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    SHUTTER_CONFIG      Path to config file (overrides default location)
    SHUTTER_LOG         Log filter (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/shutter/config.toml"#
    );
}

fn open_index(config: &Config) -> Result<Arc<SqliteMediaIndex>> {
    let index = SqliteMediaIndex::open(&config.db_path, config.platform.supports_atomic_trash_toggle)
        .with_context(|| format!("Failed to open index {}", config.db_path.display()))?;
    Ok(Arc::new(index))
}

fn print_albums(albums: &[Album]) {
    let mut albums = albums.to_vec();
    sort_for_display(&mut albums);
    if albums.is_empty() {
        println!("No albums");
        return;
    }
    for album in &albums {
        println!(
            "{:>12}  {:<32} {:>6}  {}",
            album.id(),
            album.name,
            album.size,
            album.thumbnail.external_content_uri()
        );
    }
}

fn print_media(media: &Media) {
    let mut flags = String::new();
    if media.is_favorite {
        flags.push('*');
    }
    if media.is_trashed {
        flags.push('T');
    }
    println!(
        "{:>8}  {:<2} {:<16} {}  {}",
        media.id,
        flags,
        media.mime_type,
        media.date_added.format("%Y-%m-%d %H:%M:%S"),
        media.external_content_uri()
    );
}

fn scan(config: &Config, index: &SqliteMediaIndex, directory: &Path) -> Result<()> {
    let scanner = Scanner::new(config.scanner.clone());
    let result = scanner.scan_directory(directory, index, None)?;
    println!(
        "Scanned {} of {} files ({} new, {} updated, {} removed)",
        result.scanned, result.total_found, result.new, result.updated, result.removed
    );
    Ok(())
}

async fn list_media(repo: &MediaRepository, album: Option<i32>, page: usize) -> Result<()> {
    let mut pager = repo.media(album);
    let mut current = None;
    for _ in 0..page {
        match pager.load_next().await? {
            Some(event) => current = Some(event),
            None => {
                current = None;
                break;
            }
        }
    }

    match current {
        Some(PagerEvent::Refresh(page)) | Some(PagerEvent::Append(page)) => {
            for media in &page.data {
                print_media(media);
            }
            if page.next_key.is_some() {
                println!("-- more on the next page");
            }
        }
        None => println!("No media on page {}", page),
    }
    Ok(())
}

async fn watch(
    config: &Config,
    index: Arc<SqliteMediaIndex>,
    repo: &MediaRepository,
    scan_dir: Option<PathBuf>,
    interval: u64,
) -> Result<()> {
    let mut albums = repo.albums();

    if let Some(dir) = scan_dir {
        let scanner = Scanner::new(config.scanner.clone());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
            loop {
                ticker.tick().await;
                let scanned =
                    tokio::task::block_in_place(|| scanner.scan_directory(&dir, &index, None));
                if let Err(e) = scanned {
                    tracing::warn!(error = %e, "Periodic scan failed");
                }
            }
        });
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            snapshot = albums.next() => match snapshot {
                Some(Ok(snapshot)) => {
                    println!("--- {}", chrono::Local::now().format("%H:%M:%S"));
                    print_albums(&snapshot);
                }
                Some(Err(e)) => bail!(e),
                None => break,
            },
        }
    }
    Ok(())
}

async fn mutate(repo: &MediaRepository, id: i64, mutation: Mutation) -> Result<()> {
    let Some(media) = repo.find(id).await? else {
        bail!("No media with ID {}", id);
    };
    let actions = repo.actions();
    match mutation {
        Mutation::Favorite(favorite) => actions.favorite(&media, favorite).await?,
        Mutation::Trash(trashed) => actions.trash(&media, trashed).await?,
        Mutation::Delete => actions.delete(&media).await?,
    }
    println!("OK {}", media.external_content_uri());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    if let Err(e) = logging::init(None) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let config = match args.config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let index = open_index(&config)?;
    let repo = MediaRepository::new(
        index.clone(),
        config.platform,
        config.paging,
        config.albums.aggregator(),
    );

    match &args.command {
        Command::Scan(dir) => scan(&config, &index, dir)?,
        Command::Albums => match repo.albums().next().await {
            Some(snapshot) => print_albums(&snapshot?),
            None => println!("No albums"),
        },
        Command::Media { album, page } => list_media(&repo, *album, *page).await?,
        Command::Watch { scan, interval } => {
            watch(&config, index.clone(), &repo, scan.clone(), *interval).await?
        }
        Command::Mutate { id, mutation } => mutate(&repo, *id, *mutation).await?,
    }

    Ok(())
}
