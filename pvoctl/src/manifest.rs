//! Manifeste de préchargement du cache
//!
//! Décrit, en YAML, la chaîne et les playlists que `pvoctl warm` doit faire
//! entrer dans le cache :
//!
//! ```yaml
//! channel:
//!   id: UCxxxxxxxxxxxxxxxxxxxxxx
//!   max_videos: 100
//!
//! playlists:
//!   - id: PLxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx
//!     name: "Leçons débutants"
//!     complete: true
//!   - id: PLyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyy
//!     name: "Concerts"
//!     max_videos: 200
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Plafond de vidéos par défaut quand le manifeste n'en donne pas
pub const DEFAULT_MAX_VIDEOS: usize = 500;

/// Section chaîne du manifeste
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSection {
    /// Identifiant de la chaîne YouTube
    pub id: String,
    /// Plafond de vidéos récentes à rapporter
    pub max_videos: Option<usize>,
}

/// Une playlist à précharger
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSection {
    /// Identifiant YouTube de la playlist
    pub id: String,
    /// Nom d'affichage, repris tel quel dans le snapshot
    pub name: String,
    /// Playlist close : fetchée une fois puis définitivement fraîche
    #[serde(default)]
    pub complete: bool,
    /// Plafond de vidéos propre à cette playlist
    pub max_videos: Option<usize>,
}

/// Manifeste complet
#[derive(Debug, Clone, Deserialize)]
pub struct WarmupManifest {
    /// Chaîne à précharger (optionnelle)
    pub channel: Option<ChannelSection>,
    /// Playlists à précharger
    #[serde(default)]
    pub playlists: Vec<PlaylistSection>,
}

impl WarmupManifest {
    /// Charge et parse le manifeste YAML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let manifest: Self = serde_yaml::from_str(&yaml)
            .with_context(|| format!("parsing manifest {}", path.display()))?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let yaml = r#"
channel:
  id: UC123
  max_videos: 100

playlists:
  - id: PL1
    name: "Leçons"
    complete: true
  - id: PL2
    name: "Concerts"
    max_videos: 200
"#;
        let manifest: WarmupManifest = serde_yaml::from_str(yaml).unwrap();

        let channel = manifest.channel.unwrap();
        assert_eq!(channel.id, "UC123");
        assert_eq!(channel.max_videos, Some(100));

        assert_eq!(manifest.playlists.len(), 2);
        assert!(manifest.playlists[0].complete);
        assert_eq!(manifest.playlists[0].max_videos, None);
        assert!(!manifest.playlists[1].complete);
        assert_eq!(manifest.playlists[1].max_videos, Some(200));
    }

    #[test]
    fn test_parse_playlists_only() {
        let yaml = r#"
playlists:
  - id: PL1
    name: "Leçons"
"#;
        let manifest: WarmupManifest = serde_yaml::from_str(yaml).unwrap();
        assert!(manifest.channel.is_none());
        assert_eq!(manifest.playlists.len(), 1);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = WarmupManifest::load("/nonexistent/playlists.yaml").unwrap_err();
        assert!(err.to_string().contains("playlists.yaml"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlists.yaml");
        std::fs::write(&path, "playlists:\n  - id: PL1\n    name: X\n").unwrap();

        let manifest = WarmupManifest::load(&path).unwrap();
        assert_eq!(manifest.playlists[0].id, "PL1");
    }
}
