//! Cache types for commerce API responses.

use autoparts_core::{CategoryId, ProductId};

use crate::http::Page;

use super::types::{Category, Product};

/// Cache key for catalog lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    /// Product listing, keyed by its API query string.
    Products(String),
    Featured(u32),
    Related(Vec<ProductId>),
    Category(CategoryId),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    ProductList(Vec<Product>),
    Category(Box<Category>),
    Categories(Vec<Category>),
}
