//! Récupération des détails de vidéos par batch (`videos.list`)

use super::{MAX_BATCH_SIZE, YoutubeApi};
use crate::error::Result;
use crate::models::{Thumbnails, Video};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Réponse de l'endpoint /videos
#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    #[serde(default)]
    snippet: Option<Snippet>,
    #[serde(rename = "contentDetails", default)]
    content_details: Option<ContentDetails>,
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
    #[serde(rename = "channelId", default)]
    channel_id: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(rename = "categoryId", default)]
    category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: Option<String>,
}

/// Les compteurs sont renvoyés sous forme de chaînes par l'API
#[derive(Debug, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount", default)]
    view_count: Option<String>,
    #[serde(rename = "likeCount", default)]
    like_count: Option<String>,
    #[serde(rename = "commentCount", default)]
    comment_count: Option<String>,
}

impl VideoResource {
    /// Convertit la ressource API en [`Video`]
    ///
    /// Les champs optionnels absents deviennent des valeurs vides plutôt que
    /// de faire échouer le batch. Une ressource sans snippet (vidéo supprimée
    /// ou privée) est écartée.
    fn into_video(self) -> Option<Video> {
        let snippet = self.snippet?;
        let statistics = self.statistics;
        Some(Video {
            url: Video::watch_url(&self.id),
            id: self.id,
            title: snippet.title,
            description: snippet.description,
            published_at: snippet.published_at,
            duration: self.content_details.and_then(|d| d.duration),
            channel_id: snippet.channel_id,
            channel_title: snippet.channel_title,
            thumbnails: snippet.thumbnails,
            tags: snippet.tags,
            category_id: snippet.category_id,
            view_count: statistics
                .as_ref()
                .and_then(|s| s.view_count.as_ref())
                .and_then(|v| v.parse().ok()),
            like_count: statistics
                .as_ref()
                .and_then(|s| s.like_count.as_ref())
                .and_then(|v| v.parse().ok()),
            comment_count: statistics
                .as_ref()
                .and_then(|s| s.comment_count.as_ref())
                .and_then(|v| v.parse().ok()),
        })
    }
}

impl YoutubeApi {
    /// Récupère les détails d'une liste de vidéos
    ///
    /// Les IDs sont regroupés par batch de [`MAX_BATCH_SIZE`], avec un délai
    /// entre deux batches. Les vidéos sont assemblées dans l'ordre des IDs
    /// fournis, indépendamment de l'ordre de réponse de l'API ; les IDs sans
    /// ressource correspondante (vidéos supprimées) sont ignorés.
    pub async fn fetch_video_details(&self, ids: &[String]) -> Result<Vec<Video>> {
        let mut videos = Vec::with_capacity(ids.len());

        for (index, chunk) in ids.chunks(MAX_BATCH_SIZE).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.page_delay()).await;
            }

            let params = vec![
                ("part", "snippet,contentDetails,statistics".to_string()),
                ("id", chunk.join(",")),
            ];
            let response: VideoListResponse = self.get_json("videos", &params).await?;

            let mut by_id: HashMap<String, VideoResource> = response
                .items
                .into_iter()
                .map(|item| (item.id.clone(), item))
                .collect();

            for id in chunk {
                match by_id.remove(id).and_then(VideoResource::into_video) {
                    Some(video) => videos.push(video),
                    None => debug!("No details returned for video {}, skipping", id),
                }
            }
        }

        debug!("Fetched details for {} video(s)", videos.len());
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn test_api(server: &mockito::ServerGuard) -> YoutubeApi {
        let mut api = YoutubeApi::with_base_url("test-key", server.url()).unwrap();
        api.set_page_delay(Duration::from_millis(0));
        api.set_retry_base_delay(Duration::from_millis(1));
        api
    }

    fn resource(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "snippet": {
                "title": format!("Titre {id}"),
                "description": "",
                "publishedAt": "2024-01-15T08:00:00Z",
                "channelId": "UC1",
                "channelTitle": "Chaîne",
                "thumbnails": {
                    "default": {"url": format!("https://i.ytimg.com/vi/{id}/default.jpg"), "width": 120, "height": 90}
                }
            },
            "contentDetails": {"duration": "PT5M"},
            "statistics": {"viewCount": "42", "likeCount": "7"}
        })
    }

    #[tokio::test]
    async fn test_fetch_preserves_id_order() {
        let mut server = mockito::Server::new_async().await;

        // L'API répond dans le désordre : l'assemblage doit suivre l'ordre des IDs
        let mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "a,b,c".into()))
            .with_body(
                json!({"items": [resource("c"), resource("a"), resource("b")]}).to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let api = test_api(&server);
        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let videos = api.fetch_video_details(&ids).await.unwrap();

        let got: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(got, vec!["a", "b", "c"]);
        assert_eq!(videos[0].view_count, Some(42));
        assert_eq!(videos[0].duration.as_deref(), Some("PT5M"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_splits_into_batches() {
        let mut server = mockito::Server::new_async().await;

        let ids: Vec<String> = (0..60).map(|i| format!("v{i:02}")).collect();
        let first: Vec<String> = ids[..MAX_BATCH_SIZE].to_vec();
        let second: Vec<String> = ids[MAX_BATCH_SIZE..].to_vec();

        let batch1 = server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), first.join(",")))
            .with_body(
                json!({"items": first.iter().map(|id| resource(id)).collect::<Vec<_>>()})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let batch2 = server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), second.join(",")))
            .with_body(
                json!({"items": second.iter().map(|id| resource(id)).collect::<Vec<_>>()})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let api = test_api(&server);
        let videos = api.fetch_video_details(&ids).await.unwrap();
        assert_eq!(videos.len(), 60);
        assert_eq!(videos[0].id, "v00");
        assert_eq!(videos[59].id, "v59");

        batch1.assert_async().await;
        batch2.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_skips_missing_resources() {
        let mut server = mockito::Server::new_async().await;

        // "b" a été supprimée : l'API ne renvoie que "a" et "c"
        let mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "a,b,c".into()))
            .with_body(json!({"items": [resource("a"), resource("c")]}).to_string())
            .expect(1)
            .create_async()
            .await;

        let api = test_api(&server);
        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let videos = api.fetch_video_details(&ids).await.unwrap();

        let got: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(got, vec!["a", "c"]);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_defaults_missing_optional_fields() {
        let mut server = mockito::Server::new_async().await;

        // Ressource minimale : pas de statistics, pas de contentDetails,
        // pas de miniatures
        let mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "bare".into()))
            .with_body(
                json!({"items": [{
                    "id": "bare",
                    "snippet": {
                        "title": "Minimal",
                        "publishedAt": "2022-06-01T00:00:00Z"
                    }
                }]})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let api = test_api(&server);
        let videos = api
            .fetch_video_details(&["bare".to_string()])
            .await
            .unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "Minimal");
        assert!(videos[0].duration.is_none());
        assert!(videos[0].view_count.is_none());
        assert!(videos[0].thumbnails.default.is_none());
        assert!(videos[0].description.is_empty());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_empty_id_list() {
        let server = mockito::Server::new_async().await;
        let api = test_api(&server);
        let videos = api.fetch_video_details(&[]).await.unwrap();
        assert!(videos.is_empty());
    }
}
