use crate::{
    messaging::config::RabbitMqConfig,
    pipeline::{
        sink::{RankingSink, SinkError},
        RenderJob
    }
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("Failed to connect to RabbitMQ: {0}")]
    ConnectionError(#[from] lapin::Error),

    #[error("Failed to serialize message: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Publisher not initialized")]
    NotInitialized
}

/// Summary of a finished ranking, broadcast to downstream renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingCompletedMessage {
    pub message_id: String,
    pub player_id: i32,
    pub display_name: String,
    pub top30_average: f64,
    pub top10_average: f64,
    pub projected_overall_delta: Option<f64>,
    pub entry_count: usize,
    pub completed_at: DateTime<Utc>
}

impl RankingCompletedMessage {
    pub fn from_job(job: &RenderJob) -> Self {
        RankingCompletedMessage {
            message_id: Uuid::new_v4().to_string(),
            player_id: job.ranking.player_id,
            display_name: job.profile.display_name.clone(),
            top30_average: job.ranking.top30_average(),
            top10_average: job.ranking.top10_average(),
            projected_overall_delta: job
                .ranking
                .projected_overall_delta(job.profile.overall_rating_fraction()),
            entry_count: job.ranking.len(),
            completed_at: job.generated_at
        }
    }
}

/// Publishes ranking summaries to a fanout exchange
pub struct RabbitMqPublisher {
    connection: Option<Arc<Connection>>,
    channel: Option<Channel>,
    exchange: String,
    routing_key: String
}

impl RabbitMqPublisher {
    pub fn new(exchange: String, routing_key: String) -> Self {
        Self {
            connection: None,
            channel: None,
            exchange,
            routing_key
        }
    }

    pub fn from_config(config: &RabbitMqConfig) -> Self {
        Self::new(config.exchange.clone(), config.routing_key.clone())
    }

    pub async fn connect_from_config(config: &RabbitMqConfig) -> Result<Self, PublisherError> {
        let mut publisher = Self::from_config(config);
        publisher.connect(&config.connection_url()).await?;
        Ok(publisher)
    }

    pub async fn connect(&mut self, rabbitmq_url: &str) -> Result<(), PublisherError> {
        let connection = Arc::new(Connection::connect(rabbitmq_url, ConnectionProperties::default()).await?);
        let channel = connection.create_channel().await?;

        channel
            .exchange_declare(
                &self.exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default()
            )
            .await?;

        self.connection = Some(connection);
        self.channel = Some(channel);

        info!("Connected to RabbitMQ, publishing to exchange '{}'", self.exchange);
        Ok(())
    }

    pub async fn publish(&self, message: &RankingCompletedMessage) -> Result<(), PublisherError> {
        let channel = self.channel.as_ref().ok_or(PublisherError::NotInitialized)?;
        let payload = serde_json::to_vec(message)?;

        channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_message_id(message.message_id.clone().into())
                    .with_timestamp(message.completed_at.timestamp() as u64)
            )
            .await?;

        debug!(
            "Published ranking for player {} to exchange '{}'",
            message.player_id, self.exchange
        );

        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some() && self.channel.is_some()
    }

    pub async fn close(&mut self) -> Result<(), PublisherError> {
        if let Some(channel) = self.channel.take() {
            channel.close(200, "Normal shutdown").await?;
        }

        if let Some(connection) = self.connection.take() {
            if let Ok(conn) = Arc::try_unwrap(connection) {
                conn.close(200, "Normal shutdown").await?;
            }
        }

        info!("RabbitMQ connection closed");
        Ok(())
    }
}

impl Drop for RabbitMqPublisher {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("RabbitMQ publisher dropped without proper closure");
        }
    }
}

/// Render stage that announces finished rankings instead of writing files
pub struct RabbitMqSink {
    publisher: Mutex<RabbitMqPublisher>
}

impl RabbitMqSink {
    pub fn new(publisher: RabbitMqPublisher) -> Self {
        RabbitMqSink {
            publisher: Mutex::new(publisher)
        }
    }

    pub async fn close(&self) -> Result<(), PublisherError> {
        self.publisher.lock().await.close().await
    }
}

#[async_trait]
impl RankingSink for RabbitMqSink {
    async fn render(&self, job: &RenderJob) -> Result<(), SinkError> {
        let message = RankingCompletedMessage::from_job(job);
        self.publisher.lock().await.publish(&message).await?;

        Ok(())
    }
}
