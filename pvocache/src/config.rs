//! Configuration du cache vidéo
//!
//! Toute la configuration est explicite et fournie par l'appelant : le cache
//! ne déduit jamais son mode (cache-only notamment) de l'environnement du
//! processus.

use std::path::PathBuf;
use std::time::Duration;

/// Répertoire de cache par défaut
pub const DEFAULT_CACHE_DIR: &str = ".cache/youtube";

/// Paramètres du cache disque
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Répertoire où vivent le ledger, les snapshots et le verrou
    pub cache_dir: PathBuf,
    /// Durée de fraîcheur d'un snapshot non complet
    pub ttl: Duration,
    /// Durée maximale d'attente d'acquisition du verrou
    pub lock_timeout: Duration,
    /// Âge au-delà duquel un verrou est considéré abandonné
    pub lock_stale_after: Duration,
    /// Durée de validité de la copie en mémoire du ledger
    pub metadata_read_ttl: Duration,
}

impl CacheConfig {
    /// Configuration par défaut pour un répertoire donné
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            ttl: Duration::from_secs(24 * 3600),
            lock_timeout: Duration::from_secs(10),
            lock_stale_after: Duration::from_secs(60),
            metadata_read_ttl: Duration::from_secs(5),
        }
    }
}

/// Options d'un chargement de playlist ou de chaîne
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Plafond de vidéos à rapporter (appliqué au listing, avant les détails)
    pub max_videos: usize,
    /// Ignore la complétude et le TTL, force un fetch réseau
    pub force_refresh: bool,
    /// Marque la playlist comme close : fetchée au plus une fois, puis
    /// définitivement fraîche (ignoré pour la chaîne)
    pub is_complete: bool,
    /// Interdit catégoriquement tout appel réseau : sert ce qui existe sur
    /// disque, ou rien. Prime sur `force_refresh`.
    pub cache_only: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_videos: 500,
            force_refresh: false,
            is_complete: false,
            cache_only: false,
        }
    }
}
