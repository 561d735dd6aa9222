//! Listing paginé des vidéos d'une playlist (`playlistItems.list`)

use super::{MAX_PAGE_SIZE, YoutubeApi};
use crate::error::Result;
use serde::Deserialize;
use tracing::debug;

/// Réponse de l'endpoint /playlistItems
#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemContentDetails {
    #[serde(rename = "videoId")]
    video_id: String,
}

impl YoutubeApi {
    /// Liste les IDs de vidéos d'une playlist, dans l'ordre de curation
    ///
    /// Suit le token de continuation jusqu'à épuisement ou jusqu'à atteindre
    /// `max_videos` IDs accumulés. Le plafond s'applique AVANT le fetch des
    /// détails : aucun appel de détail n'est gaspillé sur des IDs écartés.
    /// Un délai fixe sépare deux pages consécutives pour respecter le quota.
    ///
    /// # Arguments
    ///
    /// * `playlist_id` - Identifiant YouTube de la playlist
    /// * `max_videos` - Nombre maximal d'IDs à accumuler
    pub async fn list_playlist_video_ids(
        &self,
        playlist_id: &str,
        max_videos: usize,
    ) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("part", "contentDetails".to_string()),
                ("playlistId", playlist_id.to_string()),
                ("maxResults", MAX_PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response: PlaylistItemsResponse = self.get_json("playlistItems", &params).await?;

            for item in response.items {
                ids.push(item.content_details.video_id);
            }

            if ids.len() >= max_videos {
                ids.truncate(max_videos);
                break;
            }

            match response.next_page_token {
                Some(token) => {
                    page_token = Some(token);
                    tokio::time::sleep(self.page_delay()).await;
                }
                None => break,
            }
        }

        debug!(
            "Listed {} video id(s) for playlist {}",
            ids.len(),
            playlist_id
        );
        Ok(ids)
    }
}
