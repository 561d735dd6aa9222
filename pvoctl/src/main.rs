//! # pvoctl - Outil de gestion du cache vidéo
//!
//! Binaire en ligne de commande pour précharger et inspecter le cache disque
//! de playlists YouTube. Le préchargement (`warm`) est pensé pour tourner
//! avant un build de site : un échec de fetch individuel est signalé mais ne
//! fait pas échouer la commande, seuls une clé d'API absente ou un manifeste
//! illisible le font.

mod manifest;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use manifest::{DEFAULT_MAX_VIDEOS, WarmupManifest};
use pvocache::{CacheConfig, DEFAULT_CACHE_DIR, LoadOptions, VideoCache};
use pvoyoutube::YoutubeApi;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pvoctl", version, about = "Cache disque de playlists YouTube")]
struct Cli {
    /// Clé d'API YouTube Data v3
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Répertoire du cache
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Manifeste de préchargement
    #[arg(long, default_value = "playlists.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Précharge le cache depuis le manifeste
    Warm {
        /// Refetch tout, y compris les entrées fraîches ou complètes
        #[arg(long)]
        force: bool,
    },
    /// Affiche les statistiques du ledger
    Stats,
    /// Supprime tout le répertoire de cache
    Clear,
    /// Vérifie que chaque entrée du ledger a son snapshot sur disque
    Validate,
    /// Pose (ou retire) le drapeau de complétude d'une playlist
    MarkComplete {
        /// Identifiant de la playlist
        playlist_id: String,
        /// Retire le drapeau au lieu de le poser
        #[arg(long)]
        unset: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cache = VideoCache::new(CacheConfig::new(&cli.cache_dir));

    match cli.command {
        Commands::Warm { force } => warm(&cli, &cache, force).await,
        Commands::Stats => {
            let stats = cache.stats().await;
            println!("Playlists:  {}", stats.playlists);
            println!("Completed:  {}", stats.completed);
            println!("Videos:     {}", stats.total_videos);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Clear => {
            cache.clear().await?;
            println!("Cache cleared: {}", cli.cache_dir.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            let report = cache.validate().await;
            if report.valid {
                println!("Cache is consistent");
                Ok(ExitCode::SUCCESS)
            } else {
                for id in &report.missing {
                    println!("Missing snapshot: {}", id);
                }
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::MarkComplete { playlist_id, unset } => {
            cache.mark_complete(&playlist_id, !unset).await?;
            let known = cache.metadata().await.playlists.contains_key(&playlist_id);
            if known {
                println!(
                    "Playlist {} marked {}",
                    playlist_id,
                    if unset { "incomplete" } else { "complete" }
                );
                Ok(ExitCode::SUCCESS)
            } else {
                println!("Playlist {} is not in the cache", playlist_id);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// Précharge toutes les entrées du manifeste
///
/// Un fetch raté (la machine à états du cache ne remonte jamais d'erreur :
/// l'échec est rapporté par la provenance du chargement) compte comme échec
/// dans le résumé mais laisse la commande sortir en succès, pour ne pas
/// casser les pipelines de build sur un incident réseau.
async fn warm(cli: &Cli, cache: &VideoCache, force: bool) -> Result<ExitCode> {
    let api_key = cli
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .context("missing API key: pass --api-key or set YOUTUBE_API_KEY")?;
    let api = YoutubeApi::new(api_key)?;
    let manifest = WarmupManifest::load(&cli.config)?;

    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for playlist in &manifest.playlists {
        info!("Warming playlist {} ({})", playlist.id, playlist.name);
        let options = LoadOptions {
            max_videos: playlist.max_videos.unwrap_or(DEFAULT_MAX_VIDEOS),
            force_refresh: force,
            is_complete: playlist.complete,
            cache_only: false,
        };
        let outcome = cache
            .load_playlist_outcome(&api, &playlist.id, &playlist.name, &options)
            .await;

        if outcome.is_failure() {
            warn!("Playlist {} could not be warmed", playlist.id);
            failed += 1;
        } else {
            info!(
                "Playlist {}: {} video(s)",
                playlist.id,
                outcome.videos.len()
            );
            succeeded += 1;
        }
    }

    if let Some(channel) = &manifest.channel {
        info!("Warming channel {}", channel.id);
        let options = LoadOptions {
            max_videos: channel.max_videos.unwrap_or(DEFAULT_MAX_VIDEOS),
            force_refresh: force,
            is_complete: false,
            cache_only: false,
        };
        let outcome = cache.load_channel_outcome(&api, &channel.id, &options).await;

        if outcome.is_failure() {
            warn!("Channel {} could not be warmed", channel.id);
            failed += 1;
        } else {
            info!("Channel {}: {} video(s)", channel.id, outcome.videos.len());
            succeeded += 1;
        }
    }

    println!("Warmed {} entries, {} failures", succeeded, failed);
    Ok(ExitCode::SUCCESS)
}
