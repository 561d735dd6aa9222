//! Structures de données pour représenter les vidéos YouTube
//!
//! Les champs sont sérialisés en camelCase : c'est le format des fichiers de
//! cache sur disque, qui doit rester lisible par la couche front du site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Une variante de miniature (une résolution donnée)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thumbnail {
    /// URL de l'image
    pub url: String,
    /// Largeur en pixels (absente pour certaines vidéos anciennes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Hauteur en pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// L'ensemble des miniatures disponibles pour une vidéo
///
/// YouTube ne fournit pas toutes les résolutions pour toutes les vidéos,
/// chaque variante est donc optionnelle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Thumbnails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxres: Option<Thumbnail>,
}

/// Représente une vidéo YouTube
///
/// Construit uniquement par le fetcher à partir des réponses de l'API,
/// jamais modifié ensuite. L'identité d'une vidéo est son `id` YouTube.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// Identifiant YouTube de la vidéo
    pub id: String,
    /// Titre de la vidéo
    pub title: String,
    /// Description complète
    #[serde(default)]
    pub description: String,
    /// URL canonique de visionnage
    pub url: String,
    /// Date de publication
    pub published_at: DateTime<Utc>,
    /// Durée au format ISO 8601 (ex: "PT12M34S")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Identifiant de la chaîne
    #[serde(default)]
    pub channel_id: String,
    /// Nom de la chaîne
    #[serde(default)]
    pub channel_title: String,
    /// Miniatures disponibles
    #[serde(default)]
    pub thumbnails: Thumbnails,
    /// Tags de la vidéo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Catégorie YouTube
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Nombre de vues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    /// Nombre de likes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    /// Nombre de commentaires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
}

impl Video {
    /// Construit l'URL canonique de visionnage d'une vidéo
    pub fn watch_url(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", id)
    }
}
