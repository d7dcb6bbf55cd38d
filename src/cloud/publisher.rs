use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::config::PubNubConfig;
use crate::core::error::PublishError;

/// One snapshot of the station, as published to the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorMessage {
    pub temperature: f32,
    pub humidity: f32,
    pub motion: bool,
    /// Only present when the MQ-2 is fitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_detected: Option<bool>,
}

/// Destination for sensor snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one message, returning the service's timetoken
    async fn publish(&self, message: &SensorMessage) -> Result<String, PublishError>;
}

/// PubNub publish over the plain REST API
#[derive(Debug, Clone)]
pub struct PubNubPublisher {
    client: Client,
    origin: Url,
    publish_key: String,
    subscribe_key: String,
    channel: String,
    uuid: String,
}

impl PubNubPublisher {
    pub fn new(config: &PubNubConfig) -> Result<Self, PublishError> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| PublishError::InvalidOrigin(format!("{}: {}", config.origin, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let uuid = config
            .uuid
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self {
            client,
            origin,
            publish_key: config.publish_key.clone(),
            subscribe_key: config.subscribe_key.clone(),
            channel: config.channel.clone(),
            uuid,
        })
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// `/publish/{pub}/{sub}/0/{channel}/0/{message}?uuid=...`
    pub fn publish_url(&self, payload: &str) -> Result<Url, PublishError> {
        let mut url = self.origin.clone();
        url.path_segments_mut()
            .map_err(|_| PublishError::InvalidOrigin(self.origin.to_string()))?
            .pop_if_empty()
            .extend([
                "publish",
                self.publish_key.as_str(),
                self.subscribe_key.as_str(),
                "0",
                self.channel.as_str(),
                "0",
                payload,
            ]);
        url.query_pairs_mut().append_pair("uuid", &self.uuid);
        Ok(url)
    }
}

#[async_trait]
impl Publisher for PubNubPublisher {
    async fn publish(&self, message: &SensorMessage) -> Result<String, PublishError> {
        let payload = serde_json::to_string(message)?;
        let url = self.publish_url(&payload)?;
        debug!("Publishing to {}: {}", self.channel, payload);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        check_publish_reply(status, &body)
    }
}

/// A reply only counts when the HTTP status is a success and the body says
/// so; on other statuses the body's reason, if any, is kept
pub fn check_publish_reply(status: StatusCode, body: &str) -> Result<String, PublishError> {
    if status.is_success() {
        return parse_publish_response(body);
    }
    let reason = match parse_publish_response(body) {
        Err(PublishError::Rejected(reason)) => reason,
        _ if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no reason given")
            .to_string(),
        _ => body.trim().to_string(),
    };
    Err(PublishError::Status {
        status: status.as_u16(),
        reason,
    })
}

/// Interpret a publish reply.
///
/// Success is `[1, "Sent", "<timetoken>"]`; failures come back either as
/// `[0, "<reason>", ...]` or as an error object with a `message` field.
pub fn parse_publish_response(body: &str) -> Result<String, PublishError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|_| PublishError::InvalidResponse(body.to_string()))?;

    match &value {
        Value::Array(items) => {
            let code = items.first().and_then(Value::as_i64);
            let description = items
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            match code {
                Some(1) => Ok(items
                    .get(2)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()),
                Some(_) => Err(PublishError::Rejected(description)),
                None => Err(PublishError::InvalidResponse(body.to_string())),
            }
        }
        Value::Object(fields) => match fields.get("message").and_then(Value::as_str) {
            Some(message) => Err(PublishError::Rejected(message.to_string())),
            None => Err(PublishError::InvalidResponse(body.to_string())),
        },
        _ => Err(PublishError::InvalidResponse(body.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PubNubConfig {
        PubNubConfig {
            publish_key: "pub-c-1".to_string(),
            subscribe_key: "sub-c-1".to_string(),
            channel: "vent".to_string(),
            uuid: Some("station-1".to_string()),
            ..PubNubConfig::default()
        }
    }

    #[test]
    fn test_message_without_gas_omits_field() {
        let message = SensorMessage {
            temperature: 23.0,
            humidity: 55.0,
            motion: true,
            gas_detected: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"temperature": 23.0, "humidity": 55.0, "motion": true})
        );
    }

    #[test]
    fn test_message_with_gas_field() {
        let message = SensorMessage {
            temperature: 23.0,
            humidity: 55.0,
            motion: false,
            gas_detected: Some(true),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["gas_detected"], serde_json::json!(true));
    }

    #[test]
    fn test_publish_url_layout() {
        let publisher = PubNubPublisher::new(&config()).unwrap();
        let url = publisher.publish_url(r#"{"motion":true}"#).unwrap();

        assert!(url
            .as_str()
            .starts_with("https://ps.pndsn.com/publish/pub-c-1/sub-c-1/0/vent/0/"));
        assert_eq!(url.query(), Some("uuid=station-1"));
        // the payload is a single escaped path segment
        assert_eq!(url.path_segments().unwrap().count(), 7);
        assert!(url.path().contains("%7B"));
    }

    #[test]
    fn test_generated_uuid_when_unset() {
        let mut config = config();
        config.uuid = None;
        let publisher = PubNubPublisher::new(&config).unwrap();
        assert!(Uuid::parse_str(publisher.uuid()).is_ok());
    }

    #[test]
    fn test_bad_origin_rejected() {
        let mut config = config();
        config.origin = "not a url".to_string();
        assert!(matches!(
            PubNubPublisher::new(&config),
            Err(PublishError::InvalidOrigin(_))
        ));
    }

    #[test]
    fn test_parse_success() {
        let token = parse_publish_response(r#"[1,"Sent","17000000000000000"]"#).unwrap();
        assert_eq!(token, "17000000000000000");
    }

    #[test]
    fn test_parse_rejection() {
        let err = parse_publish_response(r#"[0,"Invalid Key","17000000000000000"]"#).unwrap_err();
        assert!(matches!(err, PublishError::Rejected(reason) if reason == "Invalid Key"));
    }

    #[test]
    fn test_parse_error_object() {
        let err = parse_publish_response(
            r#"{"status":403,"message":"Forbidden","error":true,"service":"Access Manager"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PublishError::Rejected(reason) if reason == "Forbidden"));
    }

    #[test]
    fn test_error_status_keeps_body_reason() {
        let err = check_publish_reply(
            StatusCode::FORBIDDEN,
            r#"{"status":403,"message":"Forbidden","error":true}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Status { status: 403, ref reason } if reason == "Forbidden"
        ));

        // a success-shaped body does not rescue a failed status
        let err = check_publish_reply(
            StatusCode::BAD_GATEWAY,
            r#"[1,"Sent","17000000000000000"]"#,
        )
        .unwrap_err();
        assert!(matches!(err, PublishError::Status { status: 502, .. }));

        let err = check_publish_reply(StatusCode::SERVICE_UNAVAILABLE, "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "publish failed with HTTP 503: Service Unavailable"
        );
    }

    #[test]
    fn test_success_status_parses_body() {
        let token = check_publish_reply(StatusCode::OK, r#"[1,"Sent","42"]"#).unwrap();
        assert_eq!(token, "42");
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_publish_response("<html>bad gateway</html>"),
            Err(PublishError::InvalidResponse(_))
        ));
    }
}
