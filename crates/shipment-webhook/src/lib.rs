pub mod error;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;

pub use error::{Result, WebhookError};
pub use notify::{DeliveredEvent, HttpNotifier, Notifier};
pub use routes::router;
pub use state::AppState;
pub use store::{DeliveryClaim, NewShipment, Shipment, ShipmentStore};
