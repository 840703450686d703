use serde::{Deserialize, Serialize};

/// Every web API response is wrapped in this envelope
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub error_code: Option<i32>
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "isLoggedIn", default)]
    pub is_logged_in: bool
}

/// One row of `/webapi/score/song/friend`
#[derive(Debug, Clone, Deserialize)]
pub struct FriendRankRow {
    pub user_id: i32,
    pub score: i32,
    pub best_clear_type: i32,
    pub time_played: i64,
    #[serde(default)]
    pub name: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub user_id: i32,
    #[serde(default)]
    pub user_code: Option<String>,
    #[serde(default)]
    pub max_friend: Option<i32>,
    #[serde(default)]
    pub friends: Vec<FriendInfo>
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendInfo {
    pub user_id: i32,
    pub name: String,
    #[serde(default)]
    pub user_code: Option<String>,
    /// Overall rating in hundredths, negative when hidden
    #[serde(default = "hidden_rating")]
    pub rating: i32,
    #[serde(default)]
    pub character: i32,
    #[serde(default)]
    pub is_char_uncapped: bool,
    #[serde(default)]
    pub recent_score: Vec<RecentScore>
}

fn hidden_rating() -> i32 {
    -1
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentScore {
    #[serde(default)]
    pub time_played: Option<i64>
}

/// A tracked player's best score on one chart, as reported by the remote
/// friend leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendScore {
    pub player_id: i32,
    pub score: i32,
    pub clear_type: i32,
    pub played_at_millis: i64
}

impl From<FriendRankRow> for FriendScore {
    fn from(row: FriendRankRow) -> Self {
        FriendScore {
            player_id: row.user_id,
            score: row.score,
            clear_type: row.best_clear_type,
            played_at_millis: row.time_played
        }
    }
}

/// Remote profile of a tracked player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: i32,
    pub display_name: String,
    pub user_code: Option<String>,
    /// Overall rating in hundredths. `None` when the player hides it.
    pub overall_rating: Option<i32>,
    pub character_id: i32,
    pub is_character_uncapped: bool,
    /// Time of the most recent play, zero when unknown
    pub last_activity_millis: i64
}

impl PlayerProfile {
    pub fn overall_rating_fraction(&self) -> Option<f64> {
        self.overall_rating.map(|r| r as f64 / 100.0)
    }
}

impl From<FriendInfo> for PlayerProfile {
    fn from(friend: FriendInfo) -> Self {
        let last_activity_millis = friend
            .recent_score
            .first()
            .and_then(|s| s.time_played)
            .unwrap_or(0);

        PlayerProfile {
            player_id: friend.user_id,
            display_name: friend.name,
            user_code: friend.user_code,
            overall_rating: (friend.rating >= 0).then_some(friend.rating),
            character_id: friend.character,
            is_character_uncapped: friend.is_char_uncapped,
            last_activity_millis
        }
    }
}
