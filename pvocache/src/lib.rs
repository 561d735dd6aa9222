//! # pvocache - Cache disque de playlists YouTube
//!
//! Cette crate fournit un cache persistant en lecture-à-travers pour les
//! playlists et vidéos de chaîne YouTube récupérées via `pvoyoutube`. Chaque
//! playlist vit dans son propre fichier JSON, un ledger central suit la
//! fraîcheur et la complétude de chaque entrée, et un verrou fichier
//! sérialise les écrivains du ledger entre processus.
//!
//! ## Architecture
//!
//! ```text
//! pvocache
//!     ├── store.rs    - Fichiers JSON avec remplacement atomique
//!     ├── lock.rs     - Verrou coopératif par fichier-témoin
//!     ├── metadata.rs - Ledger de fraîcheur (lecture-fusion-écriture)
//!     ├── config.rs   - Paramètres du cache et options de chargement
//!     └── cache.rs    - Orchestrateur : servir, fetcher, ou dégrader
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use pvocache::{CacheConfig, LoadOptions, VideoCache};
//! use pvoyoutube::YoutubeApi;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let api = YoutubeApi::new("ma-clé-api")?;
//!     let cache = VideoCache::new(CacheConfig::new(".cache/youtube"));
//!
//!     // Servi depuis le disque si frais, fetché et persisté sinon
//!     let videos = cache
//!         .load_playlist(&api, "PLabc123", "Leçons", &LoadOptions::default())
//!         .await;
//!     println!("{} vidéo(s)", videos.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Garanties
//!
//! - Les chargements ne retournent jamais d'erreur : en cas d'échec du fetch,
//!   le cache sert les données périmées disponibles, ou une liste vide.
//! - Un fichier corrompu est un cache miss, pas une panne.
//! - Une playlist marquée complète n'est plus jamais refetchée (sauf
//!   `force_refresh`).
//! - Le mode `cache_only` interdit tout appel réseau, sans exception.

pub mod cache;
pub mod config;
pub mod lock;
pub mod metadata;
pub mod store;

// ============================================================================
// Ré-exports
// ============================================================================

pub use cache::{
    CacheStats, CachedPlaylist, LoadOutcome, LoadSource, ValidationReport, VideoCache,
};
pub use config::{CacheConfig, DEFAULT_CACHE_DIR, LoadOptions};
pub use lock::FileLock;
pub use metadata::{
    CacheMetadata, ChannelEntry, MetadataStore, MetadataUpdate, PlaylistEntry,
};
pub use store::{JsonStore, sanitize_key};
