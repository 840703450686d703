pub mod api_structs;

use crate::{
    api::api_structs::{ApiEnvelope, FriendRankRow, FriendScore, LoginResponse, PlayerProfile, UserInfo},
    error::ProcessorError,
    model::{
        constants::FRIEND_RANK_LIMIT,
        structures::{difficulty::Difficulty, player_query::PlayerQuery}
    }
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API call to {endpoint} failed with message: {message}")]
    Rejected { endpoint: String, message: String },

    #[error("Unexpected response from {endpoint}: {source}")]
    Parse {
        endpoint: String,
        #[source]
        source: serde_json::Error
    },

    #[error("Login failed! Please check your email and password")]
    LoginFailed
}

/// Remote source of scores and player profiles.
///
/// Implementations perform exactly one remote call per method invocation and
/// never retry; failures are reported to the caller as-is.
#[async_trait]
pub trait ScoreApi: Send + Sync {
    /// Best scores of every tracked player who has played the chart
    async fn fetch_friend_scores(&self, song_id: &str, difficulty: Difficulty) -> Result<Vec<FriendScore>, ApiError>;

    /// Every player on the account's friend list
    async fn fetch_friends(&self) -> Result<Vec<PlayerProfile>, ApiError>;

    async fn find_player(&self, query: &PlayerQuery) -> Result<Option<PlayerProfile>, ApiError> {
        Ok(self.fetch_friends().await?.into_iter().find(|profile| query.matches(profile)))
    }
}

/// Looks up every requested player among the account's friends with a
/// single friend list fetch. Unknown players are logged and skipped. Without
/// arguments, every friend is returned.
pub async fn resolve_players(api: &dyn ScoreApi, players: &[String]) -> Result<Vec<PlayerProfile>, ProcessorError> {
    let friends = api.fetch_friends().await?;
    if players.is_empty() {
        return Ok(friends);
    }

    let mut profiles = Vec::with_capacity(players.len());
    for player in players {
        let query = PlayerQuery::parse(player);
        match friends.iter().find(|profile| query.matches(profile)) {
            Some(profile) => profiles.push(profile.clone()),
            None => warn!("{}", ProcessorError::NotFound(query.to_string()))
        }
    }

    Ok(profiles)
}

/// Session-based client for the game's web API
#[derive(Clone)]
pub struct WebApiClient {
    client: Client,
    api_root: String
}

impl WebApiClient {
    pub fn new(api_root: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(WebApiClient {
            client,
            api_root: api_root.trim_end_matches('/').to_string()
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response: LoginResponse = self
            .client
            .post(format!("{}/auth/login", self.api_root))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !response.is_logged_in {
            return Err(ApiError::LoginFailed);
        }

        info!("Logged in to {}", self.api_root);
        Ok(())
    }

    pub async fn user_info(&self) -> Result<UserInfo, ApiError> {
        self.get_value("/webapi/user/me", &[]).await
    }

    async fn get_value<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        debug!("GET {}{} {:?}", self.api_root, endpoint, query);

        let body: serde_json::Value = self
            .client
            .get(format!("{}{}", self.api_root, endpoint))
            .query(query)
            .send()
            .await?
            .json()
            .await?;

        unwrap_envelope(endpoint, body)
    }
}

/// Checks the `success` flag and deserializes `value`
pub fn unwrap_envelope<T: DeserializeOwned>(endpoint: &str, body: serde_json::Value) -> Result<T, ApiError> {
    let raw = body.to_string();
    let envelope: ApiEnvelope = serde_json::from_value(body).map_err(|source| ApiError::Parse {
        endpoint: endpoint.to_string(),
        source
    })?;

    if !envelope.success {
        return Err(ApiError::Rejected {
            endpoint: endpoint.to_string(),
            message: raw
        });
    }

    serde_json::from_value(envelope.value.unwrap_or(serde_json::Value::Null)).map_err(|source| ApiError::Parse {
        endpoint: endpoint.to_string(),
        source
    })
}

#[async_trait]
impl ScoreApi for WebApiClient {
    async fn fetch_friend_scores(&self, song_id: &str, difficulty: Difficulty) -> Result<Vec<FriendScore>, ApiError> {
        let query = [
            ("song_id", song_id.to_string()),
            ("difficulty", (difficulty as u8).to_string()),
            ("limit", FRIEND_RANK_LIMIT.to_string())
        ];
        let rows: Vec<FriendRankRow> = self.get_value("/webapi/score/song/friend", &query).await?;

        Ok(rows.into_iter().map(FriendScore::from).collect())
    }

    async fn fetch_friends(&self) -> Result<Vec<PlayerProfile>, ApiError> {
        let info = self.user_info().await?;

        Ok(info.friends.into_iter().map(PlayerProfile::from).collect())
    }
}
