use serde::Deserialize;

use stockroom_inventory::ClientStock;
use stockroom_parties::{Client, ClientUpdate, ContactInfo, NewClient};
use stockroom_products::{NewProduct, Product, ProductUpdate};
use stockroom_infra::TransferReceipt;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /products` and `PUT /products/:id` (full replace).
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_in_cents: i64,
    pub quantity: i64,
}

impl ProductRequest {
    pub fn into_new(self) -> NewProduct {
        NewProduct {
            name: self.name,
            description: self.description,
            price_in_cents: self.price_in_cents,
            quantity: self.quantity,
        }
    }

    pub fn into_update(self) -> ProductUpdate {
        ProductUpdate {
            name: self.name,
            description: self.description,
            price_in_cents: self.price_in_cents,
            quantity: self.quantity,
        }
    }
}

/// Body of `POST /clients` and `PUT /clients/:id`.
#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ClientRequest {
    fn contact(&self) -> ContactInfo {
        ContactInfo {
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    pub fn into_new(self) -> NewClient {
        NewClient {
            contact: self.contact(),
            name: self.name,
        }
    }

    pub fn into_update(self) -> ClientUpdate {
        ClientUpdate {
            contact: self.contact(),
            name: self.name,
        }
    }
}

/// Body of `POST /products/:id/transfer`.
///
/// `quantity` is kept as raw JSON so a missing, fractional or non-numeric
/// value is reported as an invalid quantity rather than a parse failure.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub client_id: String,
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
}

impl TransferRequest {
    pub fn integer_quantity(&self) -> Option<i64> {
        self.quantity.as_ref().and_then(serde_json::Value::as_i64)
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(p: Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "name": p.name,
        "description": p.description,
        "price_in_cents": p.price_in_cents,
        "quantity": p.quantity,
        "created_at": p.timestamps.created_at.to_rfc3339(),
        "updated_at": p.timestamps.updated_at.to_rfc3339(),
    })
}

pub fn client_to_json(c: Client) -> serde_json::Value {
    serde_json::json!({
        "id": c.id.to_string(),
        "name": c.name,
        "email": c.contact.email,
        "phone": c.contact.phone,
        "created_at": c.timestamps.created_at.to_rfc3339(),
        "updated_at": c.timestamps.updated_at.to_rfc3339(),
    })
}

pub fn client_stock_to_json(s: ClientStock) -> serde_json::Value {
    serde_json::json!({
        "client_id": s.client_id.to_string(),
        "product_id": s.product_id.to_string(),
        "quantity": s.quantity,
        "updated_at": s.timestamps.updated_at.to_rfc3339(),
    })
}

pub fn transfer_to_json(r: TransferReceipt) -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "product_id": r.product_id.to_string(),
        "client_id": r.client_id.to_string(),
        "quantity": r.quantity,
        "remaining_stock": r.remaining_stock,
        "client_quantity": r.client_quantity,
    })
}
