use crate::error::{Result, WebhookError};
use crate::notify::DeliveredEvent;
use crate::state::AppState;
use crate::store::{DeliveryClaim, NewShipment};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{Value, json};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/fulfillment", post(fulfillment))
        .route("/webhooks/tracking", post(tracking))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fulfillment created/updated event from the storefront
#[derive(Debug, Deserialize)]
pub struct FulfillmentEvent {
    /// Numeric on some platforms, string on others
    pub order_id: Option<Value>,
    pub email: Option<String>,
    pub tracking_company: Option<String>,
    #[serde(default)]
    pub tracking_numbers: Vec<String>,
    pub tracking_number: Option<String>,
}

impl FulfillmentEvent {
    /// Distinct, non-blank tracking numbers in payload order
    fn tracking_numbers(&self) -> Vec<String> {
        let mut numbers: Vec<String> = Vec::new();
        let candidates = self
            .tracking_numbers
            .iter()
            .chain(self.tracking_number.iter())
            .map(|n| n.trim())
            .filter(|n| !n.is_empty());
        for number in candidates {
            if !numbers.iter().any(|n| n == number) {
                numbers.push(number.to_string());
            }
        }
        numbers
    }

    fn order_id(&self) -> Option<String> {
        match self.order_id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

async fn fulfillment(State(state): State<AppState>, Json(event): Json<FulfillmentEvent>) -> Result<Response> {
    let order_id = event
        .order_id()
        .ok_or_else(|| WebhookError::InvalidRequest("order_id is required".to_string()))?;
    let numbers = event.tracking_numbers();
    if numbers.is_empty() {
        return Err(WebhookError::InvalidRequest(
            "at least one tracking number is required".to_string(),
        ));
    }

    let email = event.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    let carrier = event
        .tracking_company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let shipments: Vec<NewShipment> = numbers
        .iter()
        .map(|number| NewShipment {
            order_id: order_id.clone(),
            email: email.map(str::to_string),
            tracking_number: number.clone(),
            carrier: carrier.map(str::to_string),
        })
        .collect();
    let now = Utc::now();
    state
        .store
        .blocking(move |store| {
            for shipment in &shipments {
                store.upsert(shipment, now)?;
            }
            Ok(())
        })
        .await?;
    info!("Recorded {} shipment(s) for order {}", numbers.len(), order_id);

    Ok((StatusCode::OK, Json(json!({ "stored": numbers.len() }))).into_response())
}

/// Carrier tracking callback
#[derive(Debug, Deserialize)]
pub struct TrackingEvent {
    pub status: Option<String>,
    pub tracking_number: Option<String>,
}

async fn tracking(State(state): State<AppState>, Json(event): Json<TrackingEvent>) -> Result<Response> {
    let tracking_number = event
        .tracking_number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| WebhookError::InvalidRequest("tracking_number is required".to_string()))?;

    let delivered = event
        .status
        .as_deref()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("delivered"));
    if !delivered {
        return Ok((StatusCode::OK, Json(json!({ "result": "ignored" }))).into_response());
    }

    let number = tracking_number.to_string();
    let now = Utc::now();
    let claim = state
        .store
        .blocking(move |store| store.claim_delivery(&number, now))
        .await?;
    let shipment = match claim {
        DeliveryClaim::Unknown => return Ok(StatusCode::NO_CONTENT.into_response()),
        DeliveryClaim::AlreadyProcessed => {
            return Ok((StatusCode::OK, Json(json!({ "result": "already_processed" }))).into_response());
        }
        DeliveryClaim::Claimed(shipment) => shipment,
    };

    let Some(email) = shipment.email.clone() else {
        warn!(
            "Shipment {} delivered but has no email, nothing to notify",
            tracking_number
        );
        return Ok((StatusCode::OK, Json(json!({ "result": "no_email" }))).into_response());
    };

    let event = DeliveredEvent {
        email,
        order_id: shipment.order_id,
        tracking_number: shipment.tracking_number,
        carrier: shipment.carrier,
    };
    if let Err(e) = state.notifier.delivered(&event).await {
        // Let the sender's retry claim it again
        let number = tracking_number.to_string();
        state
            .store
            .blocking(move |store| store.release_delivery(&number))
            .await?;
        return Err(e);
    }
    info!(
        "Delivered event sent for order {} ({})",
        event.order_id, event.tracking_number
    );

    Ok((StatusCode::OK, Json(json!({ "result": "notified" }))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: Value) -> FulfillmentEvent {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_tracking_numbers_merged_and_deduplicated() {
        let e = event(json!({
            "order_id": 1,
            "tracking_numbers": ["A1", " ", "B2", "A1"],
            "tracking_number": "B2"
        }));
        assert_eq!(e.tracking_numbers(), vec!["A1", "B2"]);
    }

    #[test]
    fn test_single_tracking_number_accepted() {
        let e = event(json!({"order_id": "77", "tracking_number": "C3"}));
        assert_eq!(e.tracking_numbers(), vec!["C3"]);
        assert_eq!(e.order_id(), Some("77".to_string()));
    }

    #[test]
    fn test_numeric_order_id() {
        let e = event(json!({"order_id": 450789469}));
        assert_eq!(e.order_id(), Some("450789469".to_string()));
    }
}
