//! Couche d'accès à l'API YouTube Data v3
//!
//! Ce module fournit le client HTTP bas-niveau, avec la politique de retry
//! partagée par tous les endpoints. Les endpoints eux-mêmes sont répartis
//! dans les sous-modules `playlists`, `videos` et `channel`.

pub mod channel;
pub mod playlists;
pub mod videos;

use crate::error::{Result, YoutubeError};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// URL de base de l'API YouTube Data v3
const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Taille de page maximale autorisée par l'API pour les listings
pub const MAX_PAGE_SIZE: u32 = 50;

/// Nombre maximal d'IDs par requête de détails (`videos.list`)
pub const MAX_BATCH_SIZE: usize = 50;

/// Nombre maximal de tentatives supplémentaires après un premier échec
///
/// Le compteur est partagé entre les erreurs génériques et le rate limiting.
pub const MAX_RETRIES: u32 = 3;

/// Délai par défaut entre deux pages ou deux batches (respect du quota)
const DEFAULT_PAGE_DELAY_MS: u64 = 200;

/// Délai de base du backoff exponentiel entre deux tentatives
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Forme des erreurs renvoyées par l'API Google
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client API bas-niveau pour communiquer avec YouTube
pub struct YoutubeApi {
    /// Client HTTP
    client: Client,
    /// Clé d'API YouTube Data v3
    api_key: String,
    /// URL de base (remplaçable pour les tests)
    base_url: String,
    /// Délai entre deux pages ou batches consécutifs
    page_delay: Duration,
    /// Délai de base du backoff exponentiel
    retry_base_delay: Duration,
}

impl YoutubeApi {
    /// Crée une nouvelle instance de l'API
    ///
    /// # Arguments
    ///
    /// * `api_key` - Clé d'API YouTube Data v3
    ///
    /// # Errors
    ///
    /// Retourne [`YoutubeError::MissingApiKey`] si la clé est vide.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    /// Crée une instance pointant vers une URL de base personnalisée
    ///
    /// Utilisé par les tests pour cibler un serveur HTTP local.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(YoutubeError::MissingApiKey);
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        })
    }

    /// Modifie le délai inter-pages (surtout utile pour les tests)
    pub fn set_page_delay(&mut self, delay: Duration) {
        self.page_delay = delay;
    }

    /// Modifie le délai de base du backoff (surtout utile pour les tests)
    pub fn set_retry_base_delay(&mut self, delay: Duration) {
        self.retry_base_delay = delay;
    }

    /// Retourne le délai inter-pages configuré
    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }

    /// Effectue une requête GET avec retry et backoff exponentiel
    ///
    /// Toutes les erreurs (réseau, 5xx, rate limit) partagent le même compteur
    /// de tentatives. Un 429 dort le temps annoncé par l'en-tête `Retry-After`
    /// quand il est présent, sinon le backoff exponentiel s'applique. Une fois
    /// le compteur épuisé, la dernière erreur est remontée à l'appelant.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let mut attempts = 0u32;
        loop {
            match self.try_get(path, params).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempts += 1;
                    if attempts > MAX_RETRIES {
                        return Err(err);
                    }

                    let backoff = self.retry_base_delay * 2u32.pow(attempts - 1);
                    let delay = match &err {
                        YoutubeError::RateLimited {
                            retry_after: Some(seconds),
                        } => Duration::from_secs(*seconds),
                        _ => backoff,
                    };

                    warn!(
                        "YouTube API request to {} failed (attempt {}/{}): {} - retrying in {:?}",
                        path, attempts, MAX_RETRIES, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Effectue une seule tentative de requête GET
    async fn try_get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);

            return Err(YoutubeError::from_status_code(
                status.as_u16(),
                message,
                retry_after,
            ));
        }

        debug!("YouTube API request to {} succeeded", path);
        Ok(response.json::<T>().await?)
    }
}
