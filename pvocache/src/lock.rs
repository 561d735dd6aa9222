//! Verrou coopératif par fichier-témoin
//!
//! Sérialise les écrivains du ledger de métadonnées entre plusieurs processus
//! partageant le même répertoire de cache. Le verrou repose sur la création
//! exclusive d'un fichier marqueur contenant son horodatage de création ; un
//! marqueur plus vieux que le seuil de péremption est considéré abandonné
//! (processus mort) et récupéré.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Intervalle entre deux tentatives d'acquisition
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Contenu du fichier marqueur
#[derive(Debug, Serialize, Deserialize)]
struct LockMarker {
    /// Horodatage de création du verrou
    created: DateTime<Utc>,
    /// PID du détenteur (informatif, pour le debug)
    pid: u32,
}

/// Verrou fichier avec timeout et récupération des verrous périmés
pub struct FileLock {
    /// Chemin du fichier marqueur
    path: PathBuf,
    /// Durée maximale d'attente d'acquisition
    acquire_timeout: Duration,
    /// Âge au-delà duquel un marqueur est considéré abandonné
    stale_after: Duration,
}

impl FileLock {
    /// Crée un verrou sur le chemin donné
    pub fn new<P: AsRef<Path>>(path: P, acquire_timeout: Duration, stale_after: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            acquire_timeout,
            stale_after,
        }
    }

    /// Tente d'acquérir le verrou
    ///
    /// Retourne `true` si le verrou est acquis, `false` si le timeout global
    /// est atteint. Un échec d'acquisition n'est pas fatal pour l'appelant :
    /// la politique est de sauter la mise à jour protégée plutôt que de
    /// bloquer ou planter (le ledger est un résumé reconstructible).
    pub async fn acquire(&self) -> bool {
        let started = Instant::now();

        loop {
            match self.try_create() {
                Ok(()) => {
                    debug!("Acquired lock {}", self.path.display());
                    return true;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if self.reclaim_if_stale() {
                        continue;
                    }
                }
                Err(e) => {
                    warn!("Failed to create lock {}: {}", self.path.display(), e);
                }
            }

            if started.elapsed() >= self.acquire_timeout {
                warn!(
                    "Timed out acquiring lock {} after {:?}",
                    self.path.display(),
                    self.acquire_timeout
                );
                return false;
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Relâche le verrou (no-op si le marqueur a déjà disparu)
    pub fn release(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released lock {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to release lock {}: {}", self.path.display(), e),
        }
    }

    /// Crée le marqueur en mode création exclusive
    fn try_create(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;

        let marker = LockMarker {
            created: Utc::now(),
            pid: std::process::id(),
        };
        let json = serde_json::to_string(&marker).unwrap_or_default();
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Supprime le marqueur s'il est périmé ou illisible
    ///
    /// Retourne `true` si un marqueur a été supprimé (une nouvelle tentative
    /// de création peut suivre immédiatement).
    fn reclaim_if_stale(&self) -> bool {
        let age = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|json| serde_json::from_str::<LockMarker>(&json).ok())
            .map(|marker| Utc::now().signed_duration_since(marker.created));

        let stale = match age {
            Some(age) => age.to_std().map(|a| a > self.stale_after).unwrap_or(true),
            // Marqueur vide ou corrompu : probablement un écrivain mort en
            // pleine création
            None => true,
        };

        if stale {
            warn!("Removing stale lock {}", self.path.display());
            let _ = std::fs::remove_file(&self.path);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn lock_at(path: &Path) -> FileLock {
        FileLock::new(
            path,
            Duration::from_millis(300),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.lock");
        let lock = lock_at(&path);

        assert!(lock.acquire().await);
        assert!(path.exists());

        lock.release();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_contended_acquire_times_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.lock");

        let holder = lock_at(&path);
        assert!(holder.acquire().await);

        // Un second acquéreur doit échouer après son timeout, sans paniquer
        let contender = lock_at(&path);
        assert!(!contender.acquire().await);

        holder.release();
        assert!(contender.acquire().await);
        contender.release();
    }

    #[tokio::test]
    async fn test_stale_lock_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.lock");

        // Marqueur laissé par un processus mort il y a longtemps
        let marker = LockMarker {
            created: Utc::now() - chrono::Duration::hours(2),
            pid: 0,
        };
        std::fs::write(&path, serde_json::to_string(&marker).unwrap()).unwrap();

        let lock = lock_at(&path);
        assert!(lock.acquire().await);
        lock.release();
    }

    #[tokio::test]
    async fn test_corrupt_marker_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.lock");
        std::fs::write(&path, "garbage").unwrap();

        let lock = lock_at(&path);
        assert!(lock.acquire().await);
        lock.release();
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.lock");
        let lock = lock_at(&path);

        assert!(lock.acquire().await);
        lock.release();
        // Déjà relâché : pas d'erreur
        lock.release();
    }
}
