use serde::{Deserialize, Serialize};

/// Event name the payment provider sends when an account buys the upgrade.
pub const USER_UPGRADED: &str = "user.upgraded";

/// Payload of the payment provider's webhook.
///
/// Unknown event names are accepted and ignored by the handler, so `event` is
/// kept as a plain string rather than a closed enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookData {
    pub user_id: Option<u64>,
}

impl WebhookEvent {
    /// The user to upgrade, if this is an upgrade event.
    pub fn upgraded_user(&self) -> Option<Option<u64>> {
        (self.event == USER_UPGRADED).then_some(self.data.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upgrade_event_carries_user() {
        let ev: WebhookEvent =
            serde_json::from_str(r#"{"event":"user.upgraded","data":{"user_id":3}}"#).unwrap();
        assert_eq!(ev.upgraded_user(), Some(Some(3)));
    }

    #[test]
    fn other_events_are_ignored() {
        let ev: WebhookEvent = serde_json::from_str(r#"{"event":"user.payment_failed"}"#).unwrap();
        assert_eq!(ev.upgraded_user(), None);
    }

    #[test]
    fn upgrade_without_user_is_detected() {
        let ev: WebhookEvent =
            serde_json::from_str(r#"{"event":"user.upgraded","data":{}}"#).unwrap();
        assert_eq!(ev.upgraded_user(), Some(None));
    }
}
