//! Shipment persistence
//!
//! One row per tracking number. `processed_delivered` flips from 0 to 1
//! through a single conditional UPDATE, so concurrent or repeated
//! "delivered" callbacks can claim a shipment only once.

use crate::error::{Result, WebhookError};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS shipments (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id            TEXT NOT NULL,
    email               TEXT,
    tracking_number     TEXT NOT NULL UNIQUE,
    carrier             TEXT,
    status              TEXT NOT NULL DEFAULT 'in_transit',
    delivered_at        TEXT,
    processed_delivered INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
)
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub order_id: String,
    pub email: Option<String>,
    pub tracking_number: String,
    pub carrier: Option<String>,
    pub status: String,
    pub delivered_at: Option<String>,
    pub processed_delivered: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Shipment {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: row.get("order_id")?,
            email: row.get("email")?,
            tracking_number: row.get("tracking_number")?,
            carrier: row.get("carrier")?,
            status: row.get("status")?,
            delivered_at: row.get("delivered_at")?,
            processed_delivered: row.get::<_, i64>("processed_delivered")? != 0,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Fields supplied by a fulfillment event
#[derive(Debug, Clone, PartialEq)]
pub struct NewShipment {
    pub order_id: String,
    pub email: Option<String>,
    pub tracking_number: String,
    pub carrier: Option<String>,
}

/// Result of trying to claim a shipment's delivered notification
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryClaim {
    /// This caller owns the notification
    Claimed(Shipment),
    AlreadyProcessed,
    Unknown,
}

#[derive(Clone)]
pub struct ShipmentStore {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn get_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| WebhookError::LockPoisoned)
    }

    /// Run store operations on the blocking pool, off the async workers
    pub async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&ShipmentStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store)).await?
    }

    /// Insert or refresh the row for this tracking number.
    ///
    /// Delivery state is never reset by a repeated fulfillment event.
    pub fn upsert(&self, shipment: &NewShipment, now: DateTime<Utc>) -> Result<()> {
        let conn = self.get_conn()?;
        let now = now.to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO shipments (order_id, email, tracking_number, carrier, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(tracking_number) DO UPDATE SET
                order_id   = excluded.order_id,
                email      = COALESCE(excluded.email, shipments.email),
                carrier    = COALESCE(excluded.carrier, shipments.carrier),
                updated_at = excluded.updated_at
            "#,
            params![
                shipment.order_id,
                shipment.email,
                shipment.tracking_number,
                shipment.carrier,
                now
            ],
        )?;
        Ok(())
    }

    pub fn find(&self, tracking_number: &str) -> Result<Option<Shipment>> {
        let conn = self.get_conn()?;
        let shipment = conn
            .query_row(
                "SELECT * FROM shipments WHERE tracking_number = ?1",
                params![tracking_number],
                Shipment::from_row,
            )
            .optional()?;
        Ok(shipment)
    }

    /// Mark the shipment delivered and processed if nobody did so before.
    pub fn claim_delivery(&self, tracking_number: &str, now: DateTime<Utc>) -> Result<DeliveryClaim> {
        let conn = self.get_conn()?;
        let now = now.to_rfc3339();
        let changed = conn.execute(
            r#"
            UPDATE shipments
            SET status = 'delivered',
                delivered_at = COALESCE(delivered_at, ?2),
                processed_delivered = 1,
                updated_at = ?2
            WHERE tracking_number = ?1 AND processed_delivered = 0
            "#,
            params![tracking_number, now],
        )?;

        let shipment = conn
            .query_row(
                "SELECT * FROM shipments WHERE tracking_number = ?1",
                params![tracking_number],
                Shipment::from_row,
            )
            .optional()?;

        Ok(match (changed, shipment) {
            (_, None) => DeliveryClaim::Unknown,
            (0, Some(_)) => DeliveryClaim::AlreadyProcessed,
            (_, Some(shipment)) => DeliveryClaim::Claimed(shipment),
        })
    }

    /// Give a claim back after the notification could not be sent
    pub fn release_delivery(&self, tracking_number: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE shipments SET processed_delivered = 0 WHERE tracking_number = ?1",
            params![tracking_number],
        )?;
        Ok(())
    }
}
