//! Billing webhook
//!
//! The payment provider posts signed JSON events. The signature covers the
//! raw body, so the body is verified before it is parsed.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use csvpro_common::api::{verify_signature, SIGNATURE_HEADER};
use csvpro_common::db::profiles::{set_pro_by_customer, set_pro_by_user};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{ApiError, ApiResult, AppState};

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    client_reference_id: Option<String>,
    customer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    customer: String,
    status: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Whether a subscription event leaves the customer on Pro
pub fn subscription_grants_pro(event_type: &str, status: &str) -> bool {
    event_type == SUBSCRIPTION_UPDATED && matches!(status, "active" | "trialing")
}

/// POST /api/billing/webhook
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Billing webhook not configured".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook without {} header", SIGNATURE_HEADER);
            ApiError::BadRequest("Invalid signature".to_string())
        })?;

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_signature(signature, &body, secret, state.signature_tolerance_secs, now) {
        warn!("Webhook signature verification failed: {}", e);
        return Err(ApiError::BadRequest("Invalid signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid event payload: {}", e)))?;

    handle_event(&state, event).await?;

    Ok(Json(WebhookAck { received: true }))
}

async fn handle_event(state: &AppState, event: WebhookEvent) -> ApiResult<()> {
    match event.event_type.as_str() {
        CHECKOUT_COMPLETED => {
            let session: CheckoutSession = parse_object(event.data.object)?;
            let Some(user_id) = session.client_reference_id else {
                warn!("Checkout completed without client_reference_id; ignoring");
                return Ok(());
            };

            if set_pro_by_user(&state.db, &user_id, true, session.customer.as_deref()).await? {
                info!("User {} upgraded to Pro", user_id);
            } else {
                warn!("Checkout completed for unknown user {}", user_id);
            }
        }
        SUBSCRIPTION_UPDATED | SUBSCRIPTION_DELETED => {
            let subscription: Subscription = parse_object(event.data.object)?;
            let is_pro = subscription_grants_pro(&event.event_type, &subscription.status);
            let updated = set_pro_by_customer(&state.db, &subscription.customer, is_pro).await?;
            info!(
                "Subscription {} for customer {} (status {}): is_pro={} on {} profile(s)",
                event.event_type, subscription.customer, subscription.status, is_pro, updated
            );
        }
        other => {
            info!("Unhandled event type: {}", other);
        }
    }

    Ok(())
}

fn parse_object<T: serde::de::DeserializeOwned>(object: serde_json::Value) -> ApiResult<T> {
    serde_json::from_value(object)
        .map_err(|e| ApiError::BadRequest(format!("Invalid event object: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_live_updates_grant_pro() {
        assert!(subscription_grants_pro(SUBSCRIPTION_UPDATED, "active"));
        assert!(subscription_grants_pro(SUBSCRIPTION_UPDATED, "trialing"));
        assert!(!subscription_grants_pro(SUBSCRIPTION_UPDATED, "past_due"));
        assert!(!subscription_grants_pro(SUBSCRIPTION_UPDATED, "canceled"));
        assert!(!subscription_grants_pro(SUBSCRIPTION_DELETED, "active"));
    }

    #[test]
    fn test_event_envelope_parses() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"client_reference_id":"u1","customer":"cus_9"}}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, CHECKOUT_COMPLETED);

        let session: CheckoutSession = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(session.client_reference_id.as_deref(), Some("u1"));
        assert_eq!(session.customer.as_deref(), Some("cus_9"));
    }
}
