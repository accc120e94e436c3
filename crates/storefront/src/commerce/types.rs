//! Commerce REST API (`wc/v3`) request and response types.
//!
//! Only the fields the storefront reads are modelled; everything else in the
//! payloads is ignored. Money fields arrive as strings, and optional ones as
//! empty strings, so they go through [`decimal`].

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use autoparts_core::checkout::ValidatedCheckout;
use autoparts_core::{
    Cart, CategoryId, CustomerId, OrderId, OrderStatus, PaymentMethod, ProductId, StockStatus,
};

/// Order meta key holding the checkout attempt's idempotency key.
pub const CHECKOUT_KEY_META: &str = "_checkout_key";

// =============================================================================
// Catalog
// =============================================================================

/// A product image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub id: u64,
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

/// A category reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// A tag reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagRef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub sku: String,
    /// Full description (HTML).
    #[serde(default)]
    pub description: String,
    /// Short description (HTML).
    #[serde(default)]
    pub short_description: String,
    /// Current selling price.
    #[serde(default, with = "decimal")]
    pub price: Option<Decimal>,
    #[serde(default, with = "decimal")]
    pub regular_price: Option<Decimal>,
    #[serde(default, with = "decimal")]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
    #[serde(default)]
    pub related_ids: Vec<ProductId>,
}

impl Product {
    /// Price charged, falling back to the regular price.
    #[must_use]
    pub fn unit_price(&self) -> Option<Decimal> {
        self.price.or(self.regular_price)
    }

    /// Regular price when the product is discounted below it.
    #[must_use]
    pub fn was_price(&self) -> Option<Decimal> {
        match (self.regular_price, self.unit_price()) {
            (Some(regular), Some(price)) if self.on_sale && regular > price => Some(regular),
            _ => None,
        }
    }

    /// First image, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&Image> {
        self.images.first()
    }

    /// Whether the product can be bought right now.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.stock_status.is_purchasable() && self.unit_price().is_some()
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Parent category ID (0 for top-level categories).
    #[serde(default)]
    pub parent: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<Image>,
    /// Number of published products.
    #[serde(default)]
    pub count: u32,
    /// Child categories (filled in by [`build_hierarchy`]).
    #[serde(skip)]
    pub children: Vec<Self>,
}

impl Category {
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent == 0
    }
}

/// Arrange a flat category list into top-level categories with their direct
/// children. Deeper levels are dropped from the tree.
#[must_use]
pub fn build_hierarchy(categories: Vec<Category>) -> Vec<Category> {
    let (mut parents, children): (Vec<_>, Vec<_>) =
        categories.into_iter().partition(Category::is_top_level);

    for parent in &mut parents {
        parent.children = children
            .iter()
            .filter(|child| child.parent == parent.id.get())
            .cloned()
            .collect();
    }
    parents
}

// =============================================================================
// Orders
// =============================================================================

/// Key/value metadata attached to orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub key: String,
    pub value: serde_json::Value,
}

/// Billing or shipping address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A line item in an order creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Order creation request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
    pub payment_method: String,
    pub payment_method_title: String,
    pub set_paid: bool,
    pub billing: Address,
    pub shipping: Address,
    pub line_items: Vec<NewLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub customer_note: String,
    pub meta_data: Vec<MetaData>,
}

impl NewOrder {
    /// Build an order for `cart` from a validated checkout form.
    ///
    /// The checkout key is stored in the order meta so a later lookup can
    /// recognise the order.
    #[must_use]
    pub fn from_checkout(
        checkout: &ValidatedCheckout,
        cart: &Cart,
        checkout_key: &str,
        customer_id: Option<CustomerId>,
    ) -> Self {
        let customer = &checkout.customer;
        let address = &checkout.address;
        let shipping = Address {
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            address_1: address.address_1.clone(),
            address_2: address.address_2.clone().unwrap_or_default(),
            city: address.city.clone(),
            state: address.state.clone(),
            postcode: address.postcode.clone(),
            country: address.country.clone(),
            email: None,
            phone: None,
        };
        let billing = Address {
            email: Some(customer.email.as_str().to_owned()),
            phone: Some(customer.phone.as_str().to_owned()),
            ..shipping.clone()
        };

        Self {
            payment_method: checkout.payment_method.api_id().to_owned(),
            payment_method_title: checkout.payment_method.title().to_owned(),
            set_paid: false,
            billing,
            shipping,
            line_items: cart
                .items()
                .iter()
                .map(|item| NewLineItem {
                    product_id: item.id(),
                    quantity: item.quantity,
                })
                .collect(),
            customer_id,
            customer_note: checkout.notes.clone().unwrap_or_default(),
            meta_data: vec![MetaData {
                key: CHECKOUT_KEY_META.to_owned(),
                value: serde_json::Value::String(checkout_key.to_owned()),
            }],
        }
    }
}

/// A line item on an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default, with = "decimal")]
    pub total: Option<Decimal>,
}

/// An order as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub currency: String,
    #[serde(default, with = "decimal")]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub date_created: Option<NaiveDateTime>,
    #[serde(default)]
    pub customer_id: u64,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub billing: Address,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub meta_data: Vec<MetaData>,
}

impl Order {
    /// The checkout key stored on the order, if any.
    #[must_use]
    pub fn checkout_key(&self) -> Option<&str> {
        self.meta_data
            .iter()
            .find(|m| m.key == CHECKOUT_KEY_META)
            .and_then(|m| m.value.as_str())
    }

    /// Payment method recorded on the order.
    #[must_use]
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
            .parse()
            .unwrap_or(PaymentMethod::Gateway)
    }

    /// Order total, zero when the API sent none.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.total.unwrap_or_default()
    }

    /// The number customers see, falling back to the ID.
    #[must_use]
    pub fn display_number(&self) -> String {
        if self.number.is_empty() {
            self.id.to_string()
        } else {
            self.number.clone()
        }
    }
}

/// Partial order update (`PUT /orders/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_paid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

// =============================================================================
// Customers
// =============================================================================

/// Customer registration request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCustomer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// A customer account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
}

// =============================================================================
// Serde helpers
// =============================================================================

/// Optional decimal that the API sends as a string, a number, `""` or `null`.
pub mod decimal {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Deserialize an optional decimal.
    ///
    /// # Errors
    ///
    /// Returns an error for non-numeric strings and non-scalar values.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(serde_json::Value::String(s)) => Decimal::from_str(s.trim())
                .map(Some)
                .map_err(D::Error::custom),
            Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string())
                .map(Some)
                .map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!(
                "expected a decimal, found {other}"
            ))),
        }
    }

    /// Serialize an optional decimal as a string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_str(&d.to_string()),
            None => serializer.serialize_str(""),
        }
    }
}
