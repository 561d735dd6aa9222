//! Stockage JSON sur disque avec remplacement atomique
//!
//! Chaque clé correspond à un fichier `{clé}.json` dans le répertoire de
//! cache. Les écritures passent par un fichier temporaire voisin suivi d'un
//! rename atomique : un lecteur observe toujours soit l'ancien contenu
//! complet, soit le nouveau, jamais un fichier à moitié écrit.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Transforme un identifiant externe en segment de nom de fichier sûr
///
/// Tout caractère hors `[A-Za-z0-9_-]` est remplacé par `_`.
pub fn sanitize_key(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Store JSON sur disque
///
/// Un fichier illisible (JSON corrompu, droits, etc.) est traité comme un
/// cache miss, jamais comme une erreur : le prochain fetch réussi réécrira
/// le fichier.
#[derive(Clone)]
pub struct JsonStore {
    /// Répertoire de cache
    dir: PathBuf,
}

impl JsonStore {
    /// Crée un store pour le répertoire donné
    ///
    /// Le répertoire n'est créé qu'à la première écriture.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Retourne le répertoire de cache
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Construit le chemin du fichier d'une clé
    ///
    /// Format: `{dir}/{clé}.json`
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Vérifie si le fichier d'une clé existe
    pub fn exists(&self, key: &str) -> bool {
        self.path(key).exists()
    }

    /// Charge la valeur d'une clé
    ///
    /// Retourne `None` si le fichier est absent ou illisible.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Cache file does not exist: {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read cache file {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(value) => {
                debug!("Loaded cache from {}", path.display());
                Some(value)
            }
            Err(e) => {
                warn!(
                    "Corrupt cache file {} treated as miss: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Sauvegarde la valeur d'une clé
    ///
    /// L'écriture est atomique : fichier temporaire dans le même répertoire
    /// puis rename sur la destination.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("creating cache directory {}", self.dir.display()))?;
            info!("Created cache directory: {}", self.dir.display());
        }

        let path = self.path(key);
        let json = serde_json::to_string_pretty(value)?;

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        fs::write(tmp.path(), json)
            .with_context(|| format!("writing temp file for {}", path.display()))?;
        tmp.persist(&path)
            .with_context(|| format!("replacing {}", path.display()))?;

        debug!("Saved cache to {}", path.display());
        Ok(())
    }

    /// Supprime le fichier d'une clé (no-op si absent)
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!("Removed cache file: {}", path.display());
        }
        Ok(())
    }

    /// Supprime tout le répertoire de cache (no-op si absent)
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("removing cache directory {}", self.dir.display()))?;
            info!("Cleared cache directory: {}", self.dir.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestData {
        id: String,
        value: i32,
    }

    fn sample() -> TestData {
        TestData {
            id: "test123".to_string(),
            value: 42,
        }
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        store.write("test_key", &sample()).unwrap();

        let loaded: Option<TestData> = store.read("test_key");
        assert_eq!(loaded, Some(sample()));
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let loaded: Option<TestData> = store.read("nonexistent");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_read_corrupt_is_none() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        fs::write(store.path("broken"), "{not json at all").unwrap();

        let loaded: Option<TestData> = store.read("broken");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_replaces_existing() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        store.write("key", &sample()).unwrap();
        let updated = TestData {
            id: "test123".to_string(),
            value: 7,
        };
        store.write("key", &updated).unwrap();

        let loaded: Option<TestData> = store.read("key");
        assert_eq!(loaded, Some(updated));
    }

    #[test]
    fn test_lazy_directory_creation() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("sub").join("cache");
        let store = JsonStore::new(&nested);

        assert!(!nested.exists());
        store.write("key", &sample()).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn test_clear_then_write_recreates() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("cache");
        let store = JsonStore::new(&nested);

        store.write("key", &sample()).unwrap();
        store.clear().unwrap();
        assert!(!nested.exists());

        store.write("key", &sample()).unwrap();
        assert!(store.exists("key"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        store.write("key", &sample()).unwrap();
        store.remove("key").unwrap();
        store.remove("key").unwrap();
        assert!(!store.exists("key"));
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("PLabc-123_XYZ"), "PLabc-123_XYZ");
        assert_eq!(sanitize_key("a/b?c=d"), "a_b_c_d");
        assert_eq!(sanitize_key("été"), "_t_");
    }
}
