use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::parse_catalog;
use crate::error::Result;
use crate::vector::Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub status: String,
    pub items: Vec<String>,
    pub tracking: Option<String>,
    pub estimated_delivery: Option<String>,
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderLookup {
    Found(OrderRecord),
    NotFound { status: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub price: String,
    pub in_stock: bool,
    pub stock_count: u32,
    pub description: String,
    pub warranty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProductLookup {
    Found(ProductInfo),
    NotFound { name: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShippingRate {
    pub cost: f64,
    pub days: String,
    pub free_threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShippingQuote {
    Quote {
        shipping_type: String,
        cost: f64,
        delivery_time: String,
        free_shipping_eligible: bool,
    },
    Invalid { error: String },
}

/// Customer support FAQ documents plus order, product and shipping tables.
#[derive(Debug, Clone, Deserialize)]
pub struct SupportCatalog {
    pub documents: Vec<Document>,
    #[serde(default)]
    pub orders: BTreeMap<String, OrderRecord>,
    #[serde(default)]
    pub products: BTreeMap<String, ProductInfo>,
    #[serde(default)]
    pub shipping_rates: BTreeMap<String, ShippingRate>,
}

impl SupportCatalog {
    pub fn builtin() -> Result<Self> {
        Self::from_json(include_str!("data/customer_support.json"))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        parse_catalog(json, "customer support")
    }

    pub fn order_status(&self, order_id: &str) -> OrderLookup {
        match self.orders.get(order_id.trim()) {
            Some(order) => OrderLookup::Found(order.clone()),
            None => OrderLookup::NotFound {
                status: "Not Found".to_string(),
                message: "Order not found. Please check your order number.".to_string(),
            },
        }
    }

    pub fn product_info(&self, product_name: &str) -> ProductLookup {
        let key = product_name.trim().to_lowercase().replace(' ', "_");
        match self.products.get(&key) {
            Some(product) => ProductLookup::Found(product.clone()),
            None => ProductLookup::NotFound {
                name: "Product not found".to_string(),
                message: "Product not available in our catalog".to_string(),
            },
        }
    }

    /// Shipping is free when the rate has a threshold and the order reaches it.
    pub fn calculate_shipping(&self, order_total: f64, shipping_type: &str) -> ShippingQuote {
        let Some(rate) = self.shipping_rates.get(shipping_type) else {
            return ShippingQuote::Invalid {
                error: "Invalid shipping type".to_string(),
            };
        };

        let free = rate.free_threshold.map_or(false, |t| order_total >= t);
        let cost = if free { 0.0 } else { rate.cost };
        ShippingQuote::Quote {
            shipping_type: shipping_type.to_string(),
            cost,
            delivery_time: format!("{} business days", rate.days),
            free_shipping_eligible: cost == 0.0,
        }
    }
}
