//! Gestion des erreurs pour le client YouTube

use thiserror::Error;

/// Type Result personnalisé pour pvoyoutube
pub type Result<T> = std::result::Result<T, YoutubeError>;

/// Erreurs possibles lors de l'utilisation du client YouTube
#[derive(Error, Debug)]
pub enum YoutubeError {
    /// Clé d'API absente ou vide (fatal uniquement au moment d'un fetch)
    #[error("Missing YouTube API key")]
    MissingApiKey,

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur de l'API YouTube
    #[error("YouTube API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    /// Quota dépassé (rate limiting), avec le délai annoncé par l'API si présent
    #[error("Rate limit exceeded (retry after {retry_after:?} seconds)")]
    RateLimited { retry_after: Option<u64> },

    /// Erreur générique
    #[error("YouTube error: {0}")]
    Other(String),
}

impl YoutubeError {
    /// Crée une erreur API depuis un code de statut HTTP et un message
    ///
    /// Les statuts 429 et 403 "quotaExceeded" sont mappés vers `RateLimited`.
    pub fn from_status_code(code: u16, message: impl Into<String>, retry_after: Option<u64>) -> Self {
        let message = message.into();
        match code {
            429 => Self::RateLimited { retry_after },
            403 if message.contains("quota") || message.contains("rateLimit") => {
                Self::RateLimited { retry_after }
            }
            _ => Self::ApiError { code, message },
        }
    }

    /// Vérifie si l'erreur est une erreur de rate limiting
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, YoutubeError::RateLimited { .. })
    }
}
