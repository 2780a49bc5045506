//! Canonical order model and normalization of upstream records
//!
//! Order sources disagree on field names (`orderNumber` vs `order_number`,
//! `shipTo` vs `shipping_address`, ...). Everything downstream works on
//! [`Order`], built here from raw JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recipient {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Address {
    pub line1: String,
    pub city: String,
    pub postcode: String,
}

impl Address {
    /// Non-empty address parts in display order
    pub fn parts(&self) -> Vec<&str> {
        [
            self.line1.as_str(),
            self.city.as_str(),
            self.postcode.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
}

/// One fulfillment unit, immutable after normalization
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Order {
    pub order_number: String,
    pub order_reference: String,
    pub recipient: Recipient,
    pub address: Address,
    pub created_at: Option<DateTime<Utc>>,
    pub channel_ref: Option<String>,
    pub items: Vec<LineItem>,
    pub label_pdf_url: Option<String>,
    pub tracking_number: Option<String>,
    pub service: Option<String>,
}

impl Order {
    /// Minimal order, mostly useful for building fixtures
    pub fn new(order_number: impl Into<String>) -> Self {
        let order_number = order_number.into();
        Self {
            order_reference: order_number.clone(),
            order_number,
            ..Default::default()
        }
    }
}

const NUMBER_KEYS: &[&str] = &["orderNumber", "order_number", "orderId", "order_id", "id"];
const REFERENCE_KEYS: &[&str] = &["orderReference", "order_reference", "reference", "orderKey"];
const RECIPIENT_KEYS: &[&str] = &["recipient", "shipTo", "ship_to", "shippingAddress", "shipping_address"];
const ADDRESS_KEYS: &[&str] = &["address", "shipTo", "ship_to", "shippingAddress", "shipping_address"];
const LINE1_KEYS: &[&str] = &["line1", "street1", "address1", "addressLine1", "address_line_1"];
const CITY_KEYS: &[&str] = &["city", "town"];
const POSTCODE_KEYS: &[&str] = &["postcode", "postalCode", "postal_code", "zip"];
const CREATED_KEYS: &[&str] = &["createdAt", "created_at", "createDate", "orderDate", "order_date"];
const CHANNEL_KEYS: &[&str] = &["channelRef", "channel_ref", "channelReference", "marketplaceOrderId"];
const ITEMS_KEYS: &[&str] = &["items", "lineItems", "line_items", "orderItems"];
const LABEL_KEYS: &[&str] = &["labelPdfUrl", "label_pdf_url", "labelUrl", "label_url"];
const TRACKING_KEYS: &[&str] = &["trackingNumber", "tracking_number"];
const SERVICE_KEYS: &[&str] = &["service", "serviceCode", "service_code", "carrierService"];

/// Normalize one upstream record.
///
/// Returns `None` when the record carries no usable order identifier.
pub fn normalize_order(raw: &Value) -> Option<Order> {
    let order_number = string_field(raw, NUMBER_KEYS)?;
    let order_reference = string_field(raw, REFERENCE_KEYS).unwrap_or_else(|| order_number.clone());

    let recipient_obj = object_field(raw, RECIPIENT_KEYS);
    let recipient = Recipient {
        name: recipient_obj
            .and_then(|r| string_field(r, &["name", "fullName", "full_name"]))
            .or_else(|| string_field(raw, &["recipientName", "customerName"]))
            .unwrap_or_default(),
    };

    let address = object_field(raw, ADDRESS_KEYS)
        .map(|a| Address {
            line1: string_field(a, LINE1_KEYS).unwrap_or_default(),
            city: string_field(a, CITY_KEYS).unwrap_or_default(),
            postcode: string_field(a, POSTCODE_KEYS).unwrap_or_default(),
        })
        .unwrap_or_default();

    let items = array_field(raw, ITEMS_KEYS)
        .map(|items| items.iter().filter_map(normalize_item).collect())
        .unwrap_or_default();

    Some(Order {
        order_number,
        order_reference,
        recipient,
        address,
        created_at: string_field(raw, CREATED_KEYS).and_then(|s| parse_timestamp(&s)),
        channel_ref: string_field(raw, CHANNEL_KEYS),
        items,
        label_pdf_url: string_field(raw, LABEL_KEYS),
        tracking_number: string_field(raw, TRACKING_KEYS),
        service: string_field(raw, SERVICE_KEYS),
    })
}

/// Normalize a batch of records, skipping (and logging) unusable ones.
pub fn normalize_orders(raw: &[Value]) -> Vec<Order> {
    raw.iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            let order = normalize_order(record);
            if order.is_none() {
                warn!("Skipping upstream record {} without an order identifier", idx);
            }
            order
        })
        .collect()
}

/// Keep only orders whose reference starts with `prefix`, preserving order.
pub fn filter_by_reference_prefix(orders: Vec<Order>, prefix: Option<&str>) -> Vec<Order> {
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => orders
            .into_iter()
            .filter(|o| o.order_reference.starts_with(prefix))
            .collect(),
        None => orders,
    }
}

fn normalize_item(raw: &Value) -> Option<LineItem> {
    let sku = string_field(raw, &["sku", "SKU", "productSku"]).unwrap_or_default();
    let name = string_field(raw, &["name", "title", "description"]).unwrap_or_default();
    if sku.is_empty() && name.is_empty() {
        return None;
    }
    let quantity = raw
        .get("quantity")
        .or_else(|| raw.get("qty"))
        .and_then(|q| match q {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .map(|q| q.min(u32::MAX as u64) as u32)
        .unwrap_or(1);
    Some(LineItem {
        sku,
        name,
        quantity,
    })
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn object_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| value.get(*key).filter(|v| v.is_object()))
}

fn array_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| value.get(*key)?.as_array())
}

/// Accepts RFC 3339 and the zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` form (read as UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_camel_case_record() {
        let raw = json!({
            "orderNumber": "1001",
            "orderKey": "VIV-1001",
            "shipTo": {"name": "Ada Lovelace", "street1": "1 Analytical Way", "city": "London", "postalCode": "N1 1AA"},
            "createDate": "2024-03-01T09:30:00.0000000",
            "items": [{"sku": "TEA-01", "name": "Earl Grey", "quantity": 2}],
            "labelUrl": "https://labels.example/1001.pdf"
        });

        let order = normalize_order(&raw).unwrap();
        assert_eq!(order.order_number, "1001");
        assert_eq!(order.order_reference, "VIV-1001");
        assert_eq!(order.recipient.name, "Ada Lovelace");
        assert_eq!(order.address.line1, "1 Analytical Way");
        assert_eq!(order.address.postcode, "N1 1AA");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert!(order.created_at.is_some());
        assert_eq!(order.label_pdf_url.as_deref(), Some("https://labels.example/1001.pdf"));
    }

    #[test]
    fn test_reference_defaults_to_number() {
        let order = normalize_order(&json!({"order_number": 42})).unwrap();
        assert_eq!(order.order_number, "42");
        assert_eq!(order.order_reference, "42");
        assert!(order.items.is_empty());
        assert_eq!(order.address, Address::default());
    }

    #[test]
    fn test_item_quantity_defaults_to_one() {
        let order = normalize_order(&json!({
            "id": "7",
            "line_items": [{"sku": "A"}, {"title": "Mug", "quantity": "0"}, {}]
        }))
        .unwrap();
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].quantity, 1);
        assert_eq!(order.items[1].quantity, 0);
    }

    #[test]
    fn test_record_without_identifier_is_skipped() {
        let orders = normalize_orders(&[json!({"shipTo": {}}), json!({"orderNumber": "1"})]);
        assert_eq!(orders.len(), 1);
    }

    #[test]
    fn test_prefix_filter_preserves_order() {
        let orders = ["VIV-1", "JD-2", "VIV-3"]
            .iter()
            .map(|r| Order::new(*r))
            .collect::<Vec<_>>();
        let kept = filter_by_reference_prefix(orders, Some("VIV-"));
        let refs: Vec<_> = kept.iter().map(|o| o.order_reference.as_str()).collect();
        assert_eq!(refs, vec!["VIV-1", "VIV-3"]);
    }

    #[test]
    fn test_address_parts_skip_blanks() {
        let address = Address {
            line1: "1 High St".into(),
            city: " ".into(),
            postcode: "AB1 2CD".into(),
        };
        assert_eq!(address.parts(), vec!["1 High St", "AB1 2CD"]);
    }
}
