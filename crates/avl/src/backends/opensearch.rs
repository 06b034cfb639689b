use std::fmt;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::backends::Sink;
use crate::errors::DispatchError;

/// 📡 Where the bulk bodies go, and who we say we are when we get there.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct OpenSearchSinkConfig {
    /// 📡 Cluster base URL. `/_bulk` gets appended, trailing slashes get trimmed.
    pub url: String,
    /// 🔒 Basic auth username. Unset goes out as the empty string; the header is always sent.
    #[serde(default, deserialize_with = "credential")]
    pub username: Option<String>,
    /// 🔒 "password123" is not a password. It is a confession. "123456" is also
    /// not a password, but it still has to come through as text.
    #[serde(default, deserialize_with = "credential")]
    pub password: Option<String>,
    /// ⏱️ Unset means "whatever reqwest does", which is: wait politely, possibly forever.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// 🔑 A credential is text, even when it looks like a number or a boolean.
fn credential<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CredentialVisitor;

    impl<'de> Visitor<'de> for CredentialVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean credential")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(CredentialVisitor)
}

/// 📡 The OpenSearch end of the pipe. One `send`, one POST to `_bulk`, no retries.
///
/// 🧠 Knowledge graph: the renderer already built the NDJSON body. This sink
/// only knows HTTP. Success means a 200, full stop. A 200 whose body says
/// `"errors": true` still counts (the request was delivered) but gets a `warn!`
/// with how many items the cluster turned away.
#[derive(Debug)]
pub(crate) struct OpenSearchSink {
    client: reqwest::Client,
    bulk_url: String,
    config: OpenSearchSinkConfig,
}

impl OpenSearchSink {
    /// 🚀 Build the client. No connectivity ping: the first batch finds out soon enough.
    pub(crate) fn new(config: OpenSearchSinkConfig) -> anyhow::Result<Self> {
        let mut the_builder = reqwest::Client::builder();
        if let Some(secs) = config.connect_timeout_secs {
            the_builder = the_builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.request_timeout_secs {
            the_builder = the_builder.timeout(Duration::from_secs(secs));
        }
        let client = the_builder
            .build()
            .context("💀 The HTTP client refused to be born. Probably the TLS stack. It's always the TLS stack.")?;

        // -- one slash of difference, infinite suffering of difference
        let bulk_url = format!("{}/_bulk", config.url.trim_end_matches('/'));
        Ok(Self {
            client,
            bulk_url,
            config,
        })
    }
}

#[async_trait]
impl Sink for OpenSearchSink {
    async fn send(&mut self, payload: String) -> Result<(), DispatchError> {
        if payload.is_empty() {
            debug!("🫥 empty payload, nothing to POST");
            return Ok(());
        }
        debug!(
            "📡 POSTing {} bytes to {}",
            payload.len(),
            self.bulk_url
        );

        // -- 🔒 always authenticated, even as nobody with no password: `Basic Og==`
        let the_response = self
            .client
            .post(&self.bulk_url)
            .basic_auth(
                self.config.username.as_deref().unwrap_or_default(),
                self.config.password.as_ref(),
            )
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await?;
        let the_status = the_response.status().as_u16();
        let the_body = the_response.text().await?;

        if the_status != 200 {
            return Err(DispatchError::Rejected {
                status: the_status,
                body: the_body,
            });
        }

        if let Some(failed) = failed_items(&the_body) {
            warn!(
                "⚠️ bulk request landed but {} item(s) were rejected by the cluster",
                failed
            );
        }
        Ok(())
    }

    /// 🗑️ Nothing buffered, nothing to flush. The connection pool says goodbye on drop.
    async fn close(&mut self) -> Result<(), DispatchError> {
        debug!("🗑️ OpenSearch sink closing, no buffer to flush");
        Ok(())
    }
}

/// 🔍 `Some(n)` when the bulk response says `"errors": true`; n counts items carrying an `error`.
fn failed_items(body: &str) -> Option<usize> {
    let the_response: serde_json::Value = serde_json::from_str(body).ok()?;
    if the_response.get("errors").and_then(|e| e.as_bool()) != Some(true) {
        return None;
    }
    let the_count = the_response
        .get("items")
        .and_then(|items| items.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object())
                .filter(|item| item.values().any(|result| result.get("error").is_some()))
                .count()
        })
        .unwrap_or(0);
    Some(the_count)
}
