use crate::models::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outbound WebSocket events from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    #[serde(rename = "message.new")]
    MessageNew { message: Message },

    #[serde(rename = "message.read")]
    #[serde(rename_all = "camelCase")]
    MessageRead {
        message_id: Uuid,
        read_at: DateTime<Utc>,
    },
}

impl WsOutboundEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_event_shape() {
        let event = WsOutboundEvent::MessageRead {
            message_id: Uuid::nil(),
            read_at: Utc::now(),
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "message.read");
        assert_eq!(json["messageId"], Uuid::nil().to_string());
        assert!(json.get("readAt").is_some());
    }
}
