//! Listing des vidéos récentes d'une chaîne (`search.list`, tri par date)

use super::{MAX_PAGE_SIZE, YoutubeApi};
use crate::error::Result;
use crate::models::Video;
use serde::Deserialize;
use tracing::debug;

/// Réponse de l'endpoint /search
#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: SearchItemId,
}

#[derive(Debug, Default, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

impl YoutubeApi {
    /// Liste les IDs des vidéos récentes d'une chaîne, de la plus récente à
    /// la plus ancienne
    pub async fn list_channel_video_ids(
        &self,
        channel_id: &str,
        max_videos: usize,
    ) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("part", "id".to_string()),
                ("channelId", channel_id.to_string()),
                ("order", "date".to_string()),
                ("type", "video".to_string()),
                ("maxResults", MAX_PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response: SearchListResponse = self.get_json("search", &params).await?;

            for item in response.items {
                if let Some(video_id) = item.id.video_id {
                    ids.push(video_id);
                }
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

        debug!("Listed {} video id(s) for channel {}", ids.len(), channel_id);
        Ok(ids)
    }

    /// Récupère les vidéos récentes d'une chaîne avec leurs détails complets
    ///
    /// Résout d'abord les IDs (les plus récents en premier) puis délègue à
    /// [`fetch_video_details`](Self::fetch_video_details).
    pub async fn list_channel_videos(&self, channel_id: &str, max_videos: usize) -> Result<Vec<Video>> {
        let ids = self.list_channel_video_ids(channel_id, max_videos).await?;
        self.fetch_video_details(&ids).await
    }
}
