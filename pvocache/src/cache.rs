//! Orchestrateur du cache de playlists
//!
//! Point d'entrée public du cache : décide entre servir le snapshot disque et
//! relancer un cycle fetch-et-persiste, et dégrade proprement vers les
//! données périmées (ou rien) quand le fetch échoue. Aucune erreur de la
//! chaîne de fetch ne remonte à l'appelant d'un chargement : un build de site
//! ne doit jamais casser parce que YouTube tousse.

use crate::config::{CacheConfig, LoadOptions};
use crate::lock::FileLock;
use crate::metadata::{
    CacheMetadata, ChannelEntry, MetadataStore, MetadataUpdate, PlaylistEntry,
};
use crate::store::{JsonStore, sanitize_key};
use chrono::{DateTime, Utc};
use pvoyoutube::{Video, YoutubeApi};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Clé du snapshot de chaîne dans le store
const CHANNEL_KEY: &str = "channel";

/// Nom du fichier marqueur du verrou
const LOCK_FILE: &str = "metadata.lock";

/// Snapshot persisté d'une playlist
///
/// Remplacé en bloc à chaque cycle de fetch réussi ; jamais modifié
/// partiellement. L'ordre des vidéos est celui renvoyé par la source et doit
/// survivre au round-trip disque.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPlaylist {
    /// Identifiant YouTube de la playlist
    pub id: String,
    /// Nom d'affichage (fourni par la configuration du site)
    pub name: String,
    /// Date du fetch ayant produit ce snapshot
    pub last_fetched: DateTime<Utc>,
    /// Drapeau de complétude au moment du fetch
    pub is_complete: bool,
    /// Nombre de vidéos (dérivé, persisté pour inspection rapide)
    pub video_count: usize,
    /// Les vidéos, dans l'ordre de curation de la source
    pub videos: Vec<Video>,
}

/// Statistiques dérivées du ledger seul (aucune lecture de snapshot)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Nombre de playlists suivies
    pub playlists: usize,
    /// Nombre de playlists marquées complètes
    pub completed: usize,
    /// Total de vidéos (playlists + chaîne)
    pub total_videos: u64,
}

/// Résultat de la vérification de cohérence ledger/snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Vrai si chaque entrée du ledger a son snapshot sur disque
    pub valid: bool,
    /// Identifiants dont le snapshot est manquant (`channel` pour la chaîne)
    pub missing: Vec<String>,
}

/// Provenance des vidéos retournées par un chargement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Servies depuis le snapshot disque, sans appel réseau
    Cache,
    /// Fetch réseau réussi, snapshot et ledger réécrits
    Fetched,
    /// La source rapporte zéro élément ; le snapshot précédent est conservé
    EmptyListing,
    /// Fetch raté (retries épuisés) : données périmées ou rien
    FetchFailed,
}

/// Vidéos d'un chargement, accompagnées de leur provenance
///
/// Les erreurs de fetch ne remontent jamais à l'appelant, mais la provenance
/// permet aux outils (préchargement notamment) de compter les échecs
/// honnêtement.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Les vidéos servies
    pub videos: Vec<Video>,
    /// D'où elles viennent
    pub source: LoadSource,
}

impl LoadOutcome {
    fn new(videos: Vec<Video>, source: LoadSource) -> Self {
        Self { videos, source }
    }

    /// Vrai si le chargement a tenté un fetch et que celui-ci a échoué
    pub fn is_failure(&self) -> bool {
        self.source == LoadSource::FetchFailed
    }
}

/// Cache disque de playlists YouTube
///
/// Seul écrivain des snapshots ; le ledger n'est écrit que sous le verrou.
pub struct VideoCache {
    /// Store JSON partagé (ledger + snapshots)
    store: JsonStore,
    /// Accès au ledger avec cache de lecture court
    metadata: MetadataStore,
    /// Paramètres du cache
    config: CacheConfig,
}

impl VideoCache {
    /// Crée un cache pour la configuration donnée
    pub fn new(config: CacheConfig) -> Self {
        let store = JsonStore::new(&config.cache_dir);
        let lock = FileLock::new(
            config.cache_dir.join(LOCK_FILE),
            config.lock_timeout,
            config.lock_stale_after,
        );
        let metadata = MetadataStore::new(store.clone(), lock, config.metadata_read_ttl);
        Self {
            store,
            metadata,
            config,
        }
    }

    /// Construit la clé de snapshot d'une playlist
    fn playlist_key(playlist_id: &str) -> String {
        format!("playlist_{}", sanitize_key(playlist_id))
    }

    // ========================================================================
    // Chargements
    // ========================================================================

    /// Charge les vidéos d'une playlist, depuis le cache ou la source
    ///
    /// Décisions, dans l'ordre :
    /// 1. snapshot présent et pas de `force_refresh` : s'il n'est pas périmé
    ///    (une entrée complète n'est jamais périmée), ou si `cache_only`,
    ///    servir le snapshot tel quel ;
    /// 2. `cache_only` : servir ce qui existe, vide sinon, sans jamais
    ///    toucher au réseau ;
    /// 3. sinon fetch : un listing légitimement vide préserve le snapshot
    ///    précédent (ou enregistre une playlist vide s'il n'y en avait pas) ;
    ///    un succès remplace snapshot et entrée de ledger ; un échec (retries
    ///    épuisés) sert le snapshot périmé ou vide.
    pub async fn load_playlist(
        &self,
        api: &YoutubeApi,
        playlist_id: &str,
        name: &str,
        options: &LoadOptions,
    ) -> Vec<Video> {
        self.load_playlist_outcome(api, playlist_id, name, options)
            .await
            .videos
    }

    /// Comme [`load_playlist`](Self::load_playlist), avec la provenance
    pub async fn load_playlist_outcome(
        &self,
        api: &YoutubeApi,
        playlist_id: &str,
        name: &str,
        options: &LoadOptions,
    ) -> LoadOutcome {
        let key = Self::playlist_key(playlist_id);
        let metadata = self.metadata.get().await;
        let entry = metadata.playlists.get(playlist_id);
        let snapshot: Option<CachedPlaylist> = self.store.read(&key);

        if let Some(snap) = &snapshot {
            if !options.force_refresh {
                // Le ledger fait foi ; un snapshot orphelin se rabat sur ses
                // propres champs
                let is_complete = entry.map(|e| e.is_complete).unwrap_or(snap.is_complete);
                let last_fetched = entry.map(|e| e.last_fetched).unwrap_or(snap.last_fetched);
                let stale = !is_complete && self.is_expired(last_fetched);

                if !stale || options.cache_only {
                    debug!(
                        "Serving playlist {} from cache ({} video(s))",
                        playlist_id, snap.video_count
                    );
                    return LoadOutcome::new(snap.videos.clone(), LoadSource::Cache);
                }
            }
        }

        if options.cache_only {
            debug!(
                "Cache-only mode, no usable snapshot for playlist {}",
                playlist_id
            );
            return LoadOutcome::new(
                snapshot.map(|s| s.videos).unwrap_or_default(),
                LoadSource::Cache,
            );
        }

        let fetched = self
            .fetch_playlist(api, playlist_id, options.max_videos)
            .await;

        match fetched {
            Ok(Some(videos)) => {
                let now = Utc::now();
                let snapshot = CachedPlaylist {
                    id: playlist_id.to_string(),
                    name: name.to_string(),
                    last_fetched: now,
                    is_complete: options.is_complete,
                    video_count: videos.len(),
                    videos,
                };
                self.persist_playlist(&key, playlist_id, &snapshot).await;
                info!(
                    "Fetched {} video(s) for playlist {}",
                    snapshot.video_count, playlist_id
                );
                LoadOutcome::new(snapshot.videos, LoadSource::Fetched)
            }
            Ok(None) => {
                match snapshot {
                    // Source transitoirement vide : ne jamais écraser de
                    // bonnes données avec rien
                    Some(snap) => {
                        warn!(
                            "Playlist {} listing returned no ids, keeping previous snapshot",
                            playlist_id
                        );
                        LoadOutcome::new(snap.videos, LoadSource::EmptyListing)
                    }
                    // Playlist réellement vide : enregistrée comme telle pour
                    // que la fraîcheur et le reporting la traitent normalement
                    None => {
                        info!("Playlist {} is empty at the source", playlist_id);
                        let empty = CachedPlaylist {
                            id: playlist_id.to_string(),
                            name: name.to_string(),
                            last_fetched: Utc::now(),
                            is_complete: options.is_complete,
                            video_count: 0,
                            videos: Vec::new(),
                        };
                        self.persist_playlist(&key, playlist_id, &empty).await;
                        LoadOutcome::new(Vec::new(), LoadSource::EmptyListing)
                    }
                }
            }
            Err(e) => {
                error!(
                    "Failed to fetch playlist {}: {} - serving cached data",
                    playlist_id, e
                );
                LoadOutcome::new(
                    snapshot.map(|s| s.videos).unwrap_or_default(),
                    LoadSource::FetchFailed,
                )
            }
        }
    }

    /// Charge les vidéos récentes de la chaîne
    ///
    /// Même machine à états que [`load_playlist`](Self::load_playlist), mais
    /// le snapshot de chaîne ne stocke que la séquence de vidéos : la
    /// fraîcheur vient exclusivement de l'entrée de ledger (une chaîne n'est
    /// jamais complète). `options.is_complete` est ignoré.
    pub async fn load_channel(
        &self,
        api: &YoutubeApi,
        channel_id: &str,
        options: &LoadOptions,
    ) -> Vec<Video> {
        self.load_channel_outcome(api, channel_id, options)
            .await
            .videos
    }

    /// Comme [`load_channel`](Self::load_channel), avec la provenance
    pub async fn load_channel_outcome(
        &self,
        api: &YoutubeApi,
        channel_id: &str,
        options: &LoadOptions,
    ) -> LoadOutcome {
        let metadata = self.metadata.get().await;
        let entry = metadata.channel.as_ref();
        let snapshot: Option<Vec<Video>> = self.store.read(CHANNEL_KEY);

        if let Some(videos) = &snapshot {
            if !options.force_refresh {
                // Sans entrée de ledger, l'âge du snapshot est inconnu : il
                // est traité comme périmé
                let stale = entry
                    .map(|e| self.is_expired(e.last_fetched))
                    .unwrap_or(true);

                if !stale || options.cache_only {
                    debug!("Serving channel from cache ({} video(s))", videos.len());
                    return LoadOutcome::new(videos.clone(), LoadSource::Cache);
                }
            }
        }

        if options.cache_only {
            debug!("Cache-only mode, no usable channel snapshot");
            return LoadOutcome::new(snapshot.unwrap_or_default(), LoadSource::Cache);
        }

        let fetched = self.fetch_channel(api, channel_id, options.max_videos).await;

        match fetched {
            Ok(Some(videos)) => {
                self.persist_channel(&videos).await;
                info!("Fetched {} video(s) for channel {}", videos.len(), channel_id);
                LoadOutcome::new(videos, LoadSource::Fetched)
            }
            Ok(None) => match snapshot {
                Some(videos) => {
                    warn!(
                        "Channel {} listing returned no ids, keeping previous snapshot",
                        channel_id
                    );
                    LoadOutcome::new(videos, LoadSource::EmptyListing)
                }
                None => {
                    info!("Channel {} has no videos at the source", channel_id);
                    self.persist_channel(&[]).await;
                    LoadOutcome::new(Vec::new(), LoadSource::EmptyListing)
                }
            },
            Err(e) => {
                error!(
                    "Failed to fetch channel {}: {} - serving cached data",
                    channel_id, e
                );
                LoadOutcome::new(snapshot.unwrap_or_default(), LoadSource::FetchFailed)
            }
        }
    }

    // ========================================================================
    // Maintenance / inspection
    // ========================================================================

    /// Bascule le drapeau de complétude d'une playlist déjà fetchée
    ///
    /// No-op silencieux si la playlist n'a pas d'entrée dans le ledger.
    pub async fn mark_complete(&self, playlist_id: &str, complete: bool) -> anyhow::Result<()> {
        let metadata = self.metadata.get().await;
        match metadata.playlists.get(playlist_id) {
            Some(entry) => {
                let mut entry = entry.clone();
                entry.is_complete = complete;
                self.metadata
                    .update(MetadataUpdate::for_playlist(playlist_id, entry))
                    .await?;
                info!("Marked playlist {} complete={}", playlist_id, complete);
                Ok(())
            }
            None => {
                debug!(
                    "Playlist {} has never been fetched, mark_complete ignored",
                    playlist_id
                );
                Ok(())
            }
        }
    }

    /// Supprime tout le répertoire de cache et invalide la copie en mémoire
    pub async fn clear(&self) -> anyhow::Result<()> {
        self.store.clear()?;
        self.metadata.invalidate().await;
        Ok(())
    }

    /// Statistiques dérivées du ledger seul
    pub async fn stats(&self) -> CacheStats {
        let metadata = self.metadata.get().await;
        let playlist_videos: u64 = metadata
            .playlists
            .values()
            .map(|e| e.video_count as u64)
            .sum();
        let channel_total = metadata
            .channel
            .as_ref()
            .map(|c| c.video_count as u64)
            .unwrap_or(0);

        CacheStats {
            playlists: metadata.playlists.len(),
            completed: metadata
                .playlists
                .values()
                .filter(|e| e.is_complete)
                .count(),
            total_videos: playlist_videos + channel_total,
        }
    }

    /// Vrai si le ledger existe et référence au moins une entrée
    pub async fn is_ready(&self) -> bool {
        self.metadata.exists() && self.metadata.get().await.has_entries()
    }

    /// Vérifie que chaque entrée du ledger a son snapshot sur disque
    ///
    /// Ne contrôle que l'existence des fichiers : un snapshot présent mais
    /// corrompu sera traité comme un miss à la lecture et réparé au prochain
    /// fetch.
    pub async fn validate(&self) -> ValidationReport {
        let metadata = self.metadata.get().await;
        let mut missing = Vec::new();

        let mut ids: Vec<&String> = metadata.playlists.keys().collect();
        ids.sort();
        for playlist_id in ids {
            if !self.store.exists(&Self::playlist_key(playlist_id)) {
                missing.push(playlist_id.clone());
            }
        }
        if metadata.channel.is_some() && !self.store.exists(CHANNEL_KEY) {
            missing.push(CHANNEL_KEY.to_string());
        }

        ValidationReport {
            valid: missing.is_empty(),
            missing,
        }
    }

    /// Retourne le ledger courant (pour le reporting CLI)
    pub async fn metadata(&self) -> CacheMetadata {
        self.metadata.get().await
    }

    // ========================================================================
    // Interne
    // ========================================================================

    /// Vrai si la date de fetch est au-delà du TTL configuré
    fn is_expired(&self, last_fetched: DateTime<Utc>) -> bool {
        let age = Utc::now()
            .signed_duration_since(last_fetched)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age > self.config.ttl
    }

    /// Cycle listing + détails pour une playlist
    ///
    /// `Ok(None)` signifie "la source rapporte zéro élément", distinct d'un
    /// échec de fetch.
    async fn fetch_playlist(
        &self,
        api: &YoutubeApi,
        playlist_id: &str,
        max_videos: usize,
    ) -> pvoyoutube::Result<Option<Vec<Video>>> {
        let ids = api.list_playlist_video_ids(playlist_id, max_videos).await?;
        if ids.is_empty() {
            return Ok(None);
        }
        let videos = api.fetch_video_details(&ids).await?;
        Ok(Some(videos))
    }

    /// Cycle listing + détails pour la chaîne
    async fn fetch_channel(
        &self,
        api: &YoutubeApi,
        channel_id: &str,
        max_videos: usize,
    ) -> pvoyoutube::Result<Option<Vec<Video>>> {
        let ids = api.list_channel_video_ids(channel_id, max_videos).await?;
        if ids.is_empty() {
            return Ok(None);
        }
        let videos = api.fetch_video_details(&ids).await?;
        Ok(Some(videos))
    }

    /// Persiste un snapshot et son entrée de ledger
    ///
    /// Les deux écritures forment une seule opération logique mais ne sont
    /// pas atomiques entre elles : les chargements tolèrent un ledger en
    /// avance ou en retard sur son snapshot.
    async fn persist_playlist(&self, key: &str, playlist_id: &str, snapshot: &CachedPlaylist) {
        if let Err(e) = self.store.write(key, snapshot) {
            error!("Failed to persist playlist {}: {}", playlist_id, e);
        }
        let entry = PlaylistEntry {
            last_fetched: snapshot.last_fetched,
            is_complete: snapshot.is_complete,
            video_count: snapshot.video_count,
        };
        if let Err(e) = self
            .metadata
            .update(MetadataUpdate::for_playlist(playlist_id, entry))
            .await
        {
            warn!("Failed to update ledger for playlist {}: {}", playlist_id, e);
        }
    }

    /// Persiste le snapshot de chaîne et son entrée de ledger
    async fn persist_channel(&self, videos: &[Video]) {
        if let Err(e) = self.store.write(CHANNEL_KEY, &videos) {
            error!("Failed to persist channel snapshot: {}", e);
        }
        let update = MetadataUpdate::for_channel(ChannelEntry {
            last_fetched: Utc::now(),
            video_count: videos.len(),
        });
        if let Err(e) = self.metadata.update(update).await {
            warn!("Failed to update ledger for channel: {}", e);
        }
    }
}
