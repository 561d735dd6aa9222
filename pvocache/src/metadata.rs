//! Ledger de métadonnées du cache
//!
//! Un unique fichier `metadata.json` résume, par playlist et pour la chaîne,
//! la date du dernier fetch réussi, le drapeau de complétude et le nombre de
//! vidéos. Ce résumé permet de décider de la fraîcheur sans relire les
//! snapshots complets.
//!
//! Les mises à jour suivent un cycle relecture-fusion-écriture sous le verrou
//! fichier : un écrivain concurrent ne peut jamais écraser les entrées des
//! playlists qu'il ne touche pas.

use crate::lock::FileLock;
use crate::store::JsonStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Clé du fichier ledger dans le store
pub const METADATA_KEY: &str = "metadata";

/// Version du schéma du ledger sur disque
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Entrée du ledger pour une playlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    /// Date du dernier fetch réussi
    pub last_fetched: DateTime<Utc>,
    /// Playlist close : plus jamais refetchée tant que le drapeau tient
    pub is_complete: bool,
    /// Nombre de vidéos du snapshot correspondant
    pub video_count: usize,
}

/// Entrée du ledger pour la chaîne
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    /// Date du dernier fetch réussi
    pub last_fetched: DateTime<Utc>,
    /// Nombre de vidéos du snapshot de chaîne
    pub video_count: usize,
}

/// Le ledger complet tel que persisté dans `metadata.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    /// Version du schéma (absente sur les fichiers historiques)
    #[serde(default = "default_schema_version")]
    pub version: u32,
    /// Date de la dernière écriture du ledger
    pub last_updated: DateTime<Utc>,
    /// Entrées par identifiant de playlist
    #[serde(default)]
    pub playlists: HashMap<String, PlaylistEntry>,
    /// Entrée de la chaîne, si elle a déjà été fetchée
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelEntry>,
}

impl CacheMetadata {
    /// Ledger vide (utilisé quand le fichier est absent ou corrompu)
    pub fn empty() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_updated: Utc::now(),
            playlists: HashMap::new(),
            channel: None,
        }
    }

    /// Vrai si le ledger référence au moins une playlist ou la chaîne
    pub fn has_entries(&self) -> bool {
        !self.playlists.is_empty() || self.channel.is_some()
    }
}

/// Mise à jour partielle du ledger
///
/// Seules les entrées présentes sont fusionnées ; les clés non citées sont
/// préservées telles quelles, même face à des écrivains concurrents.
#[derive(Debug, Default)]
pub struct MetadataUpdate {
    /// Entrées de playlists à insérer ou remplacer
    pub playlists: HashMap<String, PlaylistEntry>,
    /// Entrée de chaîne à remplacer (None = inchangée)
    pub channel: Option<ChannelEntry>,
}

impl MetadataUpdate {
    /// Mise à jour portant sur une seule playlist
    pub fn for_playlist(id: impl Into<String>, entry: PlaylistEntry) -> Self {
        let mut playlists = HashMap::new();
        playlists.insert(id.into(), entry);
        Self {
            playlists,
            channel: None,
        }
    }

    /// Mise à jour portant sur la chaîne
    pub fn for_channel(entry: ChannelEntry) -> Self {
        Self {
            playlists: HashMap::new(),
            channel: Some(entry),
        }
    }
}

/// Copie en mémoire du ledger avec son instant de lecture
#[derive(Debug, Clone)]
struct CachedLedger {
    value: CacheMetadata,
    fetched_at: Instant,
}

/// Accès au ledger avec cache de lecture court
///
/// Le cache en mémoire (quelques secondes) évite les relectures disque sous
/// accès en rafale pendant un build. Il est peuplé au premier `get()`,
/// rafraîchi par `update()` et invalidé par `invalidate()`.
pub struct MetadataStore {
    /// Store disque partagé avec les snapshots
    store: JsonStore,
    /// Verrou sérialisant les écrivains du ledger
    lock: FileLock,
    /// Copie en mémoire `{valeur, instant de lecture}`
    cached: RwLock<Option<CachedLedger>>,
    /// Durée de validité de la copie en mémoire
    read_ttl: Duration,
}

impl MetadataStore {
    /// Crée un accès ledger au-dessus d'un store existant
    pub fn new(store: JsonStore, lock: FileLock, read_ttl: Duration) -> Self {
        Self {
            store,
            lock,
            cached: RwLock::new(None),
            read_ttl,
        }
    }

    /// Vérifie si le fichier ledger existe sur disque
    pub fn exists(&self) -> bool {
        self.store.exists(METADATA_KEY)
    }

    /// Retourne le ledger courant
    ///
    /// Sert la copie en mémoire si elle est encore fraîche, relit le disque
    /// sinon. Retombe sur un ledger vide si le fichier est absent ou corrompu.
    pub async fn get(&self) -> CacheMetadata {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() < self.read_ttl {
                    return entry.value.clone();
                }
            }
        }

        let value: CacheMetadata = self
            .store
            .read(METADATA_KEY)
            .unwrap_or_else(CacheMetadata::empty);

        let mut cached = self.cached.write().await;
        *cached = Some(CachedLedger {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        value
    }

    /// Applique une mise à jour partielle sous le verrou
    ///
    /// Relit le ledger depuis le disque (pour intégrer les écritures des
    /// processus concurrents), fusionne les entrées fournies (qui gagnent en
    /// cas de collision de clé), horodate et réécrit. Si le verrou ne peut
    /// être acquis dans le délai imparti, la mise à jour est sautée avec un
    /// warning : le ledger n'est qu'un résumé, reconstructible au prochain
    /// fetch.
    pub async fn update(&self, update: MetadataUpdate) -> anyhow::Result<()> {
        if !self.lock.acquire().await {
            warn!("Could not acquire metadata lock, skipping ledger update");
            return Ok(());
        }

        let result = self.apply(update).await;
        self.lock.release();
        result
    }

    /// Invalide la copie en mémoire (après un `clear()` par exemple)
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    async fn apply(&self, update: MetadataUpdate) -> anyhow::Result<()> {
        // Relecture disque volontaire : la copie en mémoire peut être en
        // retard sur un écrivain concurrent
        let mut metadata: CacheMetadata = self
            .store
            .read(METADATA_KEY)
            .unwrap_or_else(CacheMetadata::empty);

        metadata.playlists.extend(update.playlists);
        if let Some(channel) = update.channel {
            metadata.channel = Some(channel);
        }
        metadata.version = SCHEMA_VERSION;
        metadata.last_updated = Utc::now();

        self.store.write(METADATA_KEY, &metadata)?;

        let mut cached = self.cached.write().await;
        *cached = Some(CachedLedger {
            value: metadata,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_store(dir: &std::path::Path) -> MetadataStore {
        let store = JsonStore::new(dir);
        let lock = FileLock::new(
            dir.join("metadata.lock"),
            Duration::from_secs(2),
            Duration::from_secs(60),
        );
        MetadataStore::new(store, lock, Duration::from_secs(5))
    }

    fn entry(count: usize) -> PlaylistEntry {
        PlaylistEntry {
            last_fetched: Utc::now(),
            is_complete: false,
            video_count: count,
        }
    }

    #[tokio::test]
    async fn test_get_empty_ledger() {
        let dir = tempdir().unwrap();
        let metadata = make_store(dir.path());

        let ledger = metadata.get().await;
        assert!(!ledger.has_entries());
        assert_eq!(ledger.version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_update_merges_disjoint_playlists() {
        let dir = tempdir().unwrap();
        let metadata = make_store(dir.path());

        metadata
            .update(MetadataUpdate::for_playlist("A", entry(3)))
            .await
            .unwrap();
        metadata
            .update(MetadataUpdate::for_playlist("B", entry(5)))
            .await
            .unwrap();

        let ledger = metadata.get().await;
        assert_eq!(ledger.playlists.get("A").unwrap().video_count, 3);
        assert_eq!(ledger.playlists.get("B").unwrap().video_count, 5);
    }

    #[tokio::test]
    async fn test_update_overwrites_same_key() {
        let dir = tempdir().unwrap();
        let metadata = make_store(dir.path());

        metadata
            .update(MetadataUpdate::for_playlist("A", entry(3)))
            .await
            .unwrap();
        metadata
            .update(MetadataUpdate::for_playlist("A", entry(9)))
            .await
            .unwrap();

        let ledger = metadata.get().await;
        assert_eq!(ledger.playlists.get("A").unwrap().video_count, 9);
    }

    #[tokio::test]
    async fn test_update_picks_up_concurrent_disk_writes() {
        let dir = tempdir().unwrap();

        // Deux accès indépendants sur le même répertoire, comme deux processus
        let first = make_store(dir.path());
        let second = make_store(dir.path());

        first
            .update(MetadataUpdate::for_playlist("A", entry(1)))
            .await
            .unwrap();
        second
            .update(MetadataUpdate::for_playlist("B", entry(2)))
            .await
            .unwrap();

        let ledger = first.get().await;
        assert!(ledger.playlists.contains_key("A"));
        assert!(ledger.playlists.contains_key("B"));
    }

    #[tokio::test]
    async fn test_channel_entry_preserved_across_playlist_updates() {
        let dir = tempdir().unwrap();
        let metadata = make_store(dir.path());

        metadata
            .update(MetadataUpdate::for_channel(ChannelEntry {
                last_fetched: Utc::now(),
                video_count: 12,
            }))
            .await
            .unwrap();
        metadata
            .update(MetadataUpdate::for_playlist("A", entry(1)))
            .await
            .unwrap();

        let ledger = metadata.get().await;
        assert_eq!(ledger.channel.as_ref().unwrap().video_count, 12);
        assert!(ledger.playlists.contains_key("A"));
    }

    #[tokio::test]
    async fn test_corrupt_ledger_falls_back_to_empty() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.write("placeholder", &1).unwrap();
        std::fs::write(store.path(METADATA_KEY), "{broken").unwrap();

        let metadata = make_store(dir.path());
        let ledger = metadata.get().await;
        assert!(!ledger.has_entries());
    }

    #[tokio::test]
    async fn test_invalidate_drops_memory_copy() {
        let dir = tempdir().unwrap();
        let metadata = make_store(dir.path());

        metadata
            .update(MetadataUpdate::for_playlist("A", entry(1)))
            .await
            .unwrap();
        assert!(metadata.get().await.has_entries());

        // Suppression du fichier derrière le dos du cache mémoire
        std::fs::remove_file(JsonStore::new(dir.path()).path(METADATA_KEY)).unwrap();
        metadata.invalidate().await;

        assert!(!metadata.get().await.has_entries());
    }

    #[test]
    fn test_ledger_json_shape() {
        let mut ledger = CacheMetadata::empty();
        ledger.playlists.insert("PL1".to_string(), entry(4));

        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains("lastUpdated"));
        assert!(json.contains("lastFetched"));
        assert!(json.contains("isComplete"));
        assert!(json.contains("videoCount"));
        // Pas de chaîne fetchée : la clé est omise
        assert!(!json.contains("channel"));
    }

    #[test]
    fn test_ledger_reads_legacy_file_without_version() {
        let json = r#"{
            "lastUpdated": "2024-01-01T00:00:00Z",
            "playlists": {
                "PL1": {"lastFetched": "2024-01-01T00:00:00Z", "isComplete": true, "videoCount": 2}
            }
        }"#;
        let ledger: CacheMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(ledger.version, SCHEMA_VERSION);
        assert!(ledger.playlists.get("PL1").unwrap().is_complete);
    }
}
