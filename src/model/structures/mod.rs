pub mod chart_rating;
pub mod difficulty;
pub mod friend_code;
pub mod player_query;
pub mod refresh_mode;
