use once_cell::sync::Lazy;
use std::env;

pub static DEFAULT_TOKEN_URL: Lazy<String> = Lazy::new(|| {
    env::var("IGDB_TOKEN_URL").unwrap_or_else(|_| "https://id.twitch.tv/oauth2/token".to_string())
});

pub static DEFAULT_API_URL: Lazy<String> = Lazy::new(|| {
    env::var("IGDB_API_URL").unwrap_or_else(|_| "https://api.igdb.com/v4".to_string())
});

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_url: String,
}

impl CatalogConfig {
    pub fn from_env() -> Self {
        Self {
            client_id: env::var("IGDB_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("IGDB_CLIENT_SECRET").unwrap_or_default(),
            token_url: DEFAULT_TOKEN_URL.clone(),
            api_url: DEFAULT_API_URL.trim_end_matches('/').to_string(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }

    pub fn games_url(&self) -> String {
        format!("{}/games", self.api_url.trim_end_matches('/'))
    }
}
