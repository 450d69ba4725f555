use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, Entity, ProductId, Timestamps};

/// A stocked item holding the global (central) quantity.
///
/// `price_in_cents` is expressed in the smallest currency unit; prices are never
/// floating point. `quantity` is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price_in_cents: i64,
    pub quantity: i64,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_in_cents: i64,
    #[serde(default)]
    pub quantity: i64,
}

/// Full replacement of a product's editable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_in_cents: i64,
    pub quantity: i64,
}

fn validate_fields(name: &str, price_in_cents: i64, quantity: i64) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if price_in_cents < 0 {
        return Err(DomainError::validation("price_in_cents cannot be negative"));
    }
    if quantity < 0 {
        return Err(DomainError::validation("quantity cannot be negative"));
    }
    Ok(())
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        validate_fields(&self.name, self.price_in_cents, self.quantity)
    }
}

impl ProductUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        validate_fields(&self.name, self.price_in_cents, self.quantity)
    }
}

impl Product {
    /// Build a new product record from validated input.
    pub fn create(id: ProductId, input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            description: input.description,
            price_in_cents: input.price_in_cents,
            quantity: input.quantity,
            timestamps: Timestamps::created(now),
        })
    }

    /// Replace editable fields, keeping identity and creation time.
    pub fn apply_update(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        update.validate()?;
        self.name = update.name.trim().to_string();
        self.description = update.description;
        self.price_in_cents = update.price_in_cents;
        self.quantity = update.quantity;
        self.timestamps.touch(now);
        Ok(())
    }

    /// Set the global quantity (used by the transfer path after a locked read).
    pub fn set_quantity(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::invariant("product quantity cannot be negative"));
        }
        self.quantity = quantity;
        self.timestamps.touch(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(name: &str, price: i64, quantity: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: "desc".to_string(),
            price_in_cents: price,
            quantity,
        }
    }

    #[test]
    fn create_trims_name_and_stamps_both_timestamps() {
        let now = Utc::now();
        let p = Product::create(ProductId::new(), new_product("  Widget ", 1999, 10), now).unwrap();
        assert_eq!(p.name, "Widget");
        assert_eq!(p.timestamps.created_at, now);
        assert_eq!(p.timestamps.updated_at, now);
    }

    #[test]
    fn create_rejects_blank_name() {
        let err = Product::create(ProductId::new(), new_product("   ", 1, 1), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }

    #[test]
    fn create_rejects_negative_price_and_quantity() {
        assert!(Product::create(ProductId::new(), new_product("a", -1, 0), Utc::now()).is_err());
        assert!(Product::create(ProductId::new(), new_product("a", 0, -1), Utc::now()).is_err());
    }

    #[test]
    fn update_keeps_id_and_created_at() {
        let created = Utc::now();
        let mut p = Product::create(ProductId::new(), new_product("a", 1, 1), created).unwrap();
        let id = p.id;
        let later = created + chrono::Duration::seconds(5);
        p.apply_update(
            ProductUpdate {
                name: "b".into(),
                description: String::new(),
                price_in_cents: 7,
                quantity: 3,
            },
            later,
        )
        .unwrap();
        assert_eq!(p.id, id);
        assert_eq!(p.name, "b");
        assert_eq!(p.quantity, 3);
        assert_eq!(p.timestamps.created_at, created);
        assert_eq!(p.timestamps.updated_at, later);
    }

    #[test]
    fn set_quantity_refuses_negative_values() {
        let mut p = Product::create(ProductId::new(), new_product("a", 1, 5), Utc::now()).unwrap();
        assert!(p.set_quantity(-1, Utc::now()).is_err());
        assert_eq!(p.quantity, 5);
    }

    #[test]
    fn json_shape_flattens_timestamps() {
        let p = Product::create(ProductId::new(), new_product("a", 1, 5), Utc::now()).unwrap();
        let v = serde_json::to_value(&p).unwrap();
        assert!(v.get("created_at").is_some());
        assert!(v.get("updated_at").is_some());
        assert_eq!(v["price_in_cents"], 1);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: validation accepts exactly the non-negative price/quantity pairs.
            #[test]
            fn validation_matches_sign_rules(
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                price in -1_000i64..1_000,
                quantity in -1_000i64..1_000,
            ) {
                let result = Product::create(ProductId::new(), new_product(&name, price, quantity), Utc::now());
                prop_assert_eq!(result.is_ok(), price >= 0 && quantity >= 0);
                if let Ok(p) = result {
                    prop_assert!(p.quantity >= 0);
                }
            }
        }
    }
}
