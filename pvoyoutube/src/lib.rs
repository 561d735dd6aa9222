//! # pvoyoutube - Client YouTube Data v3 pour PVOWeb
//!
//! Cette crate fournit le fetcher distant utilisé par le cache de playlists du
//! site : listing paginé des playlists, récupération des détails de vidéos
//! par batch, et listing des vidéos récentes d'une chaîne.
//!
//! ## Vue d'ensemble
//!
//! - Pagination par token de continuation, avec plafond d'IDs appliqué avant
//!   le fetch des détails
//! - Batches de détails limités à la taille maximale imposée par l'API
//! - Délai fixe entre deux requêtes consécutives pour respecter le quota
//! - Retry avec backoff exponentiel, compteur partagé entre erreurs
//!   génériques et rate limiting (le délai `Retry-After` est honoré)
//!
//! ## Structure des modules
//!
//! ```text
//! pvoyoutube/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── models.rs           # Structures de données (Video, Thumbnails)
//! │   ├── api/
//! │   │   ├── mod.rs          # Client HTTP + politique de retry
//! │   │   ├── playlists.rs    # Listing paginé d'une playlist
//! │   │   ├── videos.rs       # Détails de vidéos par batch
//! │   │   └── channel.rs      # Vidéos récentes d'une chaîne
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use pvoyoutube::YoutubeApi;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let api = YoutubeApi::new(std::env::var("YOUTUBE_API_KEY")?)?;
//!
//!     let ids = api.list_playlist_video_ids("PLxxxx", 200).await?;
//!     let videos = api.fetch_video_details(&ids).await?;
//!     for video in videos {
//!         println!("{} ({})", video.title, video.url);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Sémantique d'échec
//!
//! Une erreur dont les retries sont épuisés est remontée telle quelle à
//! l'appelant : c'est le signal, côté cache, de retomber sur les données déjà
//! présentes sur disque. Un résultat vide n'est renvoyé que si la source
//! rapporte réellement zéro élément.

pub mod api;
pub mod error;
pub mod models;

pub use api::{MAX_BATCH_SIZE, MAX_PAGE_SIZE, MAX_RETRIES, YoutubeApi};
pub use error::{Result, YoutubeError};
pub use models::{Thumbnail, Thumbnails, Video};
