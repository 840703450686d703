use crate::{api::api_structs::PlayerProfile, model::structures::friend_code::FriendCode};
use std::fmt;

/// How a player was named on the command line.
///
/// Nine digits are read as a friend code, any other integer as a user id,
/// anything else as a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerQuery {
    FriendCode(FriendCode),
    UserId(i32),
    DisplayName(String)
}

impl PlayerQuery {
    pub fn parse(raw: &str) -> Self {
        if let Ok(code) = FriendCode::parse(raw) {
            return PlayerQuery::FriendCode(code);
        }

        match raw.parse::<i32>() {
            Ok(player_id) => PlayerQuery::UserId(player_id),
            Err(_) => PlayerQuery::DisplayName(raw.to_string())
        }
    }

    pub fn matches(&self, profile: &PlayerProfile) -> bool {
        match self {
            PlayerQuery::FriendCode(code) => profile
                .user_code
                .as_deref()
                .and_then(|user_code| FriendCode::parse(user_code).ok())
                .is_some_and(|user_code| user_code == *code),
            PlayerQuery::UserId(player_id) => profile.player_id == *player_id,
            PlayerQuery::DisplayName(name) => profile.display_name == *name
        }
    }
}

impl fmt::Display for PlayerQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerQuery::FriendCode(code) => write!(f, "friend code {}", code),
            PlayerQuery::UserId(player_id) => write!(f, "user id {}", player_id),
            PlayerQuery::DisplayName(name) => write!(f, "player {}", name)
        }
    }
}
