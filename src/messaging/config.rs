use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_ROUTING_KEY: &str = "processing.rankings.players";

/// Connection and routing settings for the ranking publisher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabbitMqConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Virtual host (default: "/")
    pub vhost: String,
    pub port: u16,
    /// Fanout exchange rankings are published to
    pub exchange: String,
    pub routing_key: String
}

impl RabbitMqConfig {
    /// Reads `RABBITMQ_*` variables. Username and password are required.
    pub fn from_env() -> Result<Self, env::VarError> {
        let routing_key = env::var("RABBITMQ_ROUTING_KEY").unwrap_or_else(|_| DEFAULT_ROUTING_KEY.to_string());

        Ok(Self {
            host: env::var("RABBITMQ_HOST").unwrap_or_else(|_| "localhost".to_string()),
            username: env::var("RABBITMQ_USERNAME")?,
            password: env::var("RABBITMQ_PASSWORD")?,
            vhost: env::var("RABBITMQ_VHOST").unwrap_or_else(|_| "/".to_string()),
            port: env::var("RABBITMQ_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5672),
            exchange: env::var("RABBITMQ_EXCHANGE").unwrap_or_else(|_| routing_key.clone()),
            routing_key
        })
    }

    pub fn connection_url(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.username,
            self.password,
            self.host,
            self.port,
            self.vhost.replace('/', "%2F")
        )
    }
}

impl Default for RabbitMqConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            vhost: "/".to_string(),
            port: 5672,
            exchange: DEFAULT_ROUTING_KEY.to_string(),
            routing_key: DEFAULT_ROUTING_KEY.to_string()
        }
    }
}
