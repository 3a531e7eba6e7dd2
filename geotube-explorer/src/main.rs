//! # GeoTube Explorer
//!
//! Terminal client for the GeoTube API. Resolves the place name for a
//! position, lists nearby videos biased by the user's watch history and
//! opens them in the system browser, asking for age confirmation first
//! when a video is restricted.
//!
//! ```sh
//! geotube-explorer --lat 17.06 --lon -96.72 --token $GEOTUBE_TOKEN
//! ```

use std::{io, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::Parser;
use geotube_core::{
    age_gate::{GateDecision, Navigator},
    client::{ExploreApi, HttpApi},
    explore::{Explorer, ViewState},
    keywords::KeywordConfig,
    Coordinate, Credentials,
};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the GeoTube API
    #[arg(long, default_value = "http://localhost:5000/api")]
    api: Url,

    /// Device latitude. Omit both coordinates to decline location access.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Device longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Session token from `POST /api/auth/login`
    #[arg(long, env = "GEOTUBE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// JSON keyword config (`stopwords`, `min_token_len`)
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Print watch URLs instead of launching a browser
    #[arg(long)]
    no_browser: bool,
}

// ============================================================================
// Navigation
// ============================================================================

struct Terminal {
    browser: bool,
}

impl Navigator for Terminal {
    fn open(&self, url: &str) {
        println!("▶ {url}");
        if self.browser {
            if let Err(e) = webbrowser::open(url) {
                warn!("Could not launch browser: {}", e);
            }
        }
    }

    fn notify(&self, message: &str) {
        println!("⚠ {message}");
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Open(usize),
    Move(Coordinate),
    Refresh,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Err("Empty command".into());
        };

        match head {
            "q" | "quit" => Ok(Self::Quit),
            "h" | "help" | "?" => Ok(Self::Help),
            "r" | "refresh" => Ok(Self::Refresh),
            "m" | "move" => {
                let lat = parts.next();
                let lon = parts.next();
                Coordinate::parse(lat, lon)
                    .map(Self::Move)
                    .map_err(|e| e.to_string())
            }
            number => number
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Self::Open)
                .ok_or_else(|| format!("Unknown command: {number}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgeAnswer {
    Adult,
    Minor,
    Cancel,
}

impl AgeAnswer {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "s" | "si" | "sí" | "y" | "yes" => Some(Self::Adult),
            "n" | "no" => Some(Self::Minor),
            "c" | "cancel" | "cancelar" | "" => Some(Self::Cancel),
            _ => None,
        }
    }
}

const HELP: &str = "\
  <n>            abrir el video n
  m <lat> <lon>  mover el mapa
  r              recalcular preferencias y recargar
  q              salir";

// ============================================================================
// Rendering
// ============================================================================

fn render(view: &ViewState) {
    println!();
    match view.map_center {
        Some(center) => println!(
            "Videos cerca de {} ({:.4}, {:.4})",
            view.place_label, center.latitude, center.longitude
        ),
        None => println!("Videos cerca de {}", view.place_label),
    }

    if let Some(error) = &view.error {
        println!("  {error}");
        return;
    }

    if view.videos.is_empty() {
        println!("  (sin resultados)");
    }

    for (index, video) in view.videos.iter().enumerate() {
        let badge = if video.age_restricted { " [+18]" } else { "" };
        println!("{:>3}. {}{} · {}", index + 1, video.title, badge, video.channel_title);
    }
}

fn prompt_age() {
    println!("Este video tiene restricción de edad. ¿Eres mayor de edad? [s/n/c]");
}

// ============================================================================
// Main Entry Point
// ============================================================================

async fn run<A: ExploreApi, N: Navigator>(explorer: &Explorer<A, N>) -> Result<()> {
    let mut lines = BufReader::new(stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if explorer.pending_video().is_some() {
            match AgeAnswer::parse(&line) {
                Some(AgeAnswer::Adult) => {
                    explorer.confirm_age(true).await;
                }
                Some(AgeAnswer::Minor) => {
                    explorer.confirm_age(false).await;
                }
                Some(AgeAnswer::Cancel) => {
                    explorer.cancel_age();
                }
                None => prompt_age(),
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        debug!("Command: {:?}", command);

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Refresh => {
                explorer.refresh_keyword().await;
                let center = explorer.view().map_center.unwrap_or(Coordinate::FALLBACK);
                explorer.move_map(center).await;
                render(&explorer.view());
            }
            Command::Move(coord) => {
                explorer.move_map(coord).await;
                render(&explorer.view());
            }
            Command::Open(number) => {
                let view = explorer.view();
                let Some(video) = view.videos.get(number - 1) else {
                    println!("No hay video {number}");
                    continue;
                };

                if let GateDecision::AwaitConfirmation(_) = explorer.click_video(video).await {
                    prompt_age();
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("geotube_explorer=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let keywords = match &args.stopwords {
        Some(path) => KeywordConfig::load(path).map_err(|e| anyhow!(e))?,
        None => KeywordConfig::default(),
    };

    let credentials = args.token.as_deref().and_then(|t| Credentials::bearer(t));
    if credentials.is_none() {
        info!("No session token, recommendations will not use watch history");
    }

    let navigator = Terminal {
        browser: !args.no_browser,
    };
    let explorer = Explorer::new(HttpApi::new(args.api), navigator, credentials, &keywords);

    let keyword = explorer.refresh_keyword().await;
    if !keyword.is_empty() {
        info!("Preferred keyword: {}", keyword);
    }

    match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => {
            explorer.accept_location(Coordinate::new(lat, lon)?).await;
        }
        _ => {
            info!("Location not shared, centring on the default position");
            explorer.deny_location().await;
        }
    }

    render(&explorer.view());
    println!("{HELP}");

    run(&explorer).await
}
