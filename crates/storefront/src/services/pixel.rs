//! Meta Conversions API dispatcher.
//!
//! Handlers must never wait on the tracker, so [`PixelDispatcher::track`]
//! only pushes the event onto a bounded queue and fails when it is full. A
//! background worker posts each event to
//! `POST {graph_url}/{version}/{pixel_id}/events`, retrying a few times
//! before dropping it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moodeng_core::analytics::{AnalyticsError, AnalyticsEvent, AnalyticsSink};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::config::{MetaPixelConfig, StorefrontConfig};

/// Events waiting for the worker before new ones are refused.
const QUEUE_CAPACITY: usize = 1024;

/// Attempts per event before it is dropped.
const MAX_ATTEMPTS: u32 = 3;

/// Pause between attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-request timeout for the Graph API.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when talking to the Conversions API.
#[derive(Debug, Error)]
pub enum PixelError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Sink that forwards events to the Conversions API worker.
#[derive(Debug, Clone)]
pub struct PixelDispatcher {
    tx: mpsc::Sender<AnalyticsEvent>,
}

impl PixelDispatcher {
    /// Start the background worker. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn spawn(config: MetaPixelConfig, source_url: String) -> Result<Self, PixelError> {
        Self::spawn_with_capacity(config, source_url, QUEUE_CAPACITY)
    }

    fn spawn_with_capacity(
        config: MetaPixelConfig,
        source_url: String,
        capacity: usize,
    ) -> Result<Self, PixelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let (tx, rx) = mpsc::channel(capacity);

        let worker = PixelWorker {
            client,
            config,
            source_url,
        };
        tokio::spawn(worker.run(rx));

        Ok(Self { tx })
    }
}

impl AnalyticsSink for PixelDispatcher {
    fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(event) => {
                tracing::warn!(event = %event.name, "Pixel queue full, event dropped");
                AnalyticsError::Unavailable("pixel queue full".to_string())
            }
            TrySendError::Closed(_) => AnalyticsError::Unavailable("pixel worker stopped".to_string()),
        })
    }
}

struct PixelWorker {
    client: reqwest::Client,
    config: MetaPixelConfig,
    source_url: String,
}

impl PixelWorker {
    async fn run(self, mut rx: mpsc::Receiver<AnalyticsEvent>) {
        tracing::info!(pixel_id = %self.config.pixel_id, "Pixel worker started");
        while let Some(event) = rx.recv().await {
            self.deliver(&event).await;
        }
        tracing::info!("Pixel worker stopped");
    }

    async fn deliver(&self, event: &AnalyticsEvent) {
        let body = conversion_payload(event, &self.config, &self.source_url);

        for attempt in 1..=MAX_ATTEMPTS {
            match self.post(&body).await {
                Ok(()) => {
                    tracing::debug!(event = %event.name, attempt, "Pixel event delivered");
                    return;
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    tracing::debug!(event = %event.name, attempt, error = %e, "Pixel event failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    tracing::warn!(event = %event.name, error = %e, "Pixel event dropped");
                }
            }
        }
    }

    async fn post(&self, body: &Value) -> Result<(), PixelError> {
        let response = self
            .client
            .post(self.config.events_url())
            .json(body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PixelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Graph API wants money as JSON numbers, not strings.
fn as_number(amount: Decimal) -> Value {
    amount.to_f64().map_or(Value::Null, |v| json!(v))
}

/// Build the Conversions API request body for one event.
#[must_use]
pub fn conversion_payload(event: &AnalyticsEvent, config: &MetaPixelConfig, source_url: &str) -> Value {
    let user_data = event.user_data.as_ref().map_or_else(
        || json!({}),
        |contact| {
            // Graph API expects each hashed field as an array
            let mut data = serde_json::Map::new();
            for (key, value) in [
                ("em", &contact.em),
                ("ph", &contact.ph),
                ("fn", &contact.first_name),
                ("ln", &contact.last_name),
            ] {
                if let Some(hash) = value {
                    data.insert(key.to_string(), json!([hash]));
                }
            }
            Value::Object(data)
        },
    );

    let contents: Vec<Value> = event
        .contents
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "quantity": c.quantity,
                "item_price": as_number(c.item_price),
            })
        })
        .collect();

    let mut custom_data = json!({
        "currency": event.currency.code(),
        "value": as_number(event.value),
        "content_ids": event.content_ids,
        "content_type": event.content_type,
    });
    if let Some(obj) = custom_data.as_object_mut() {
        if !contents.is_empty() {
            obj.insert("contents".to_string(), Value::Array(contents));
        }
        if let Some(name) = &event.content_name {
            obj.insert("content_name".to_string(), json!(name));
        }
        if let Some(category) = &event.content_category {
            obj.insert("content_category".to_string(), json!(category));
        }
        if let Some(num_items) = event.num_items {
            obj.insert("num_items".to_string(), json!(num_items));
        }
        if let Some(order_id) = &event.order_id {
            obj.insert("order_id".to_string(), json!(order_id));
        }
    }

    let mut body = json!({
        "data": [{
            "event_name": event.name.as_str(),
            "event_time": Utc::now().timestamp(),
            "event_id": Uuid::new_v4().to_string(),
            "action_source": "website",
            "event_source_url": source_url,
            "user_data": user_data,
            "custom_data": custom_data,
        }],
        "access_token": config.access_token.expose_secret(),
    });
    if let (Some(code), Some(obj)) = (&config.test_event_code, body.as_object_mut()) {
        obj.insert("test_event_code".to_string(), json!(code));
    }

    body
}

/// Sink that logs events when no pixel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AnalyticsSink for LogSink {
    fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        tracing::debug!(
            event = %event.name,
            value = %event.value,
            content_ids = ?event.content_ids,
            "Analytics event"
        );
        Ok(())
    }
}

/// Pick the analytics sink for this configuration.
///
/// Falls back to [`LogSink`] if the pixel is disabled or its client cannot
/// be built.
#[must_use]
pub fn build_sink(config: &StorefrontConfig) -> Arc<dyn AnalyticsSink> {
    let Some(pixel) = &config.meta_pixel else {
        tracing::info!("META_PIXEL_ID not set, analytics events will be logged only");
        return Arc::new(LogSink);
    };

    match PixelDispatcher::spawn(pixel.clone(), config.base_url.clone()) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start pixel dispatcher, logging events instead");
            Arc::new(LogSink)
        }
    }
}
