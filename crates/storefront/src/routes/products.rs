//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, RawQuery, State},
    response::IntoResponse,
};
use tracing::instrument;

use autoparts_core::{CurrencyCode, ListingDefaults, ListingQuery, ProductId, discount_percentage};

use super::pagination::Pagination;
use crate::commerce::{Category, Product};
use crate::error::AppError;
use crate::filters;
use crate::html;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Number of related products shown under a product.
const RELATED_LIMIT: usize = 4;

/// Notice shown when a listing could not be loaded.
pub(crate) const LISTING_UNAVAILABLE: &str =
    "We could not load products right now. Please try again in a moment.";

/// Product card data for listings.
#[derive(Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub url: String,
    pub price: Option<String>,
    pub regular_price: Option<String>,
    pub discount: u32,
    pub image: Option<ImageView>,
    pub stock_label: &'static str,
    pub stock_class: &'static str,
    pub purchasable: bool,
}

/// Image display data for templates.
#[derive(Clone)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        let price = product.unit_price();
        let was = product.was_price();
        Self {
            id: product.id,
            name: html::decode_entities(&product.name),
            url: format!("/product/{}", product.id),
            price: price.map(|p| currency.format(p)),
            regular_price: was.map(|p| currency.format(p)),
            discount: match (was, price) {
                (Some(regular), Some(sale)) => discount_percentage(regular, sale),
                _ => 0,
            },
            image: product.primary_image().map(|img| ImageView {
                url: img.src.clone(),
                alt: if img.alt.is_empty() {
                    html::decode_entities(&product.name)
                } else {
                    img.alt.clone()
                },
            }),
            stock_label: product.stock_status.label(),
            stock_class: product.stock_status.css_class(),
            purchasable: product.is_purchasable(),
        }
    }
}

/// Category link for sidebars and the home page.
#[derive(Clone)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
    pub count: u32,
    pub selected: bool,
    pub children: Vec<CategoryLink>,
}

impl CategoryLink {
    /// Links for a category tree, marking the categories in `selected`.
    #[must_use]
    pub fn tree(categories: &[Category], query: &ListingQuery) -> Vec<Self> {
        categories
            .iter()
            .map(|c| Self {
                name: html::decode_entities(&c.name),
                url: format!("/category/{}", c.id),
                count: c.count,
                selected: query.categories.contains(&c.id),
                children: Self::tree(&c.children, query),
            })
            .collect()
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub heading: String,
    pub products: Vec<ProductCard>,
    pub categories: Vec<CategoryLink>,
    pub pagination: Pagination,
    pub total: u32,
    pub error: Option<&'static str>,
    pub search: String,
    pub min_price: String,
    pub max_price: String,
    pub orderby: String,
    pub action: String,
    pub search_key: &'static str,
    /// Any filter beyond paging is applied; shows the reset link.
    pub filtered: bool,
    pub empty_message: &'static str,
}

/// Breadcrumb entry.
#[derive(Clone)]
pub struct Crumb {
    pub label: String,
    pub url: Option<String>,
}

/// Product detail data.
#[derive(Clone)]
pub struct ProductDetail {
    pub card: ProductCard,
    pub sku: String,
    pub description: String,
    pub short_description: String,
    pub images: Vec<ImageView>,
    pub tags: Vec<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductDetail,
    pub breadcrumbs: Vec<Crumb>,
    pub related_products: Vec<ProductCard>,
}

/// Display the product listing.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RawQuery(raw): RawQuery,
) -> impl IntoResponse {
    let query = ListingQuery::parse(ListingDefaults::PRODUCTS, raw.as_deref().unwrap_or(""));
    let categories = load_categories(&state).await;
    render_listing(&state, page, query, "/products", "All products".to_owned(), &categories).await
}

/// Load the category tree, empty if the API is unavailable.
pub(crate) async fn load_categories(state: &AppState) -> Vec<Category> {
    match state.commerce().categories().await {
        Ok(categories) => categories,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load categories");
            Vec::new()
        }
    }
}

/// Fetch one page of products for `query` and render the listing template.
///
/// A failed fetch renders an empty listing with a notice.
pub(crate) async fn render_listing(
    state: &AppState,
    page: PageContext,
    query: ListingQuery,
    path: &str,
    heading: String,
    categories: &[Category],
) -> ProductsIndexTemplate {
    let currency = state.currency();
    let (products, pagination, total, error) = match state.commerce().products(&query).await {
        Ok(result) => (
            result
                .items
                .iter()
                .map(|p| ProductCard::new(p, currency))
                .collect(),
            Pagination::new(&query, path, result.total_pages),
            result.total,
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load products");
            (Vec::new(), Pagination::default(), 0, Some(LISTING_UNAVAILABLE))
        }
    };

    ProductsIndexTemplate {
        page,
        heading,
        products,
        categories: CategoryLink::tree(categories, &query),
        pagination,
        total,
        error,
        search: query.search.clone().unwrap_or_default(),
        min_price: query.min_price.map(|d| d.normalize().to_string()).unwrap_or_default(),
        max_price: query.max_price.map(|d| d.normalize().to_string()).unwrap_or_default(),
        orderby: query
            .orderby
            .map(|o| o.as_str().to_owned())
            .unwrap_or_default(),
        action: path.to_owned(),
        search_key: query.defaults().search_key,
        filtered: query.has_filters(),
        empty_message: "No products match these filters.",
    }
}

/// Display a product.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.commerce().product(id).await?;
    let currency = state.currency();

    let related_ids: Vec<ProductId> = product
        .related_ids
        .iter()
        .copied()
        .take(RELATED_LIMIT)
        .collect();
    let related_products = if related_ids.is_empty() {
        Vec::new()
    } else {
        match state.commerce().products_by_ids(&related_ids).await {
            Ok(products) => products
                .iter()
                .map(|p| ProductCard::new(p, currency))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load related products");
                Vec::new()
            }
        }
    };

    Ok(ProductShowTemplate {
        page,
        breadcrumbs: breadcrumbs(&product),
        product: ProductDetail {
            card: ProductCard::new(&product, currency),
            sku: product.sku.clone(),
            description: html::sanitize(&product.description),
            short_description: html::sanitize(&product.short_description),
            images: product
                .images
                .iter()
                .map(|img| ImageView {
                    url: img.src.clone(),
                    alt: img.alt.clone(),
                })
                .collect(),
            tags: product.tags.iter().map(|t| t.name.clone()).collect(),
        },
        related_products,
    })
}

/// Home, the product's first category, then the product itself.
fn breadcrumbs(product: &Product) -> Vec<Crumb> {
    let mut crumbs = vec![
        Crumb {
            label: "Home".to_owned(),
            url: Some("/".to_owned()),
        },
        Crumb {
            label: "Products".to_owned(),
            url: Some("/products".to_owned()),
        },
    ];
    if let Some(category) = product.categories.first() {
        crumbs.push(Crumb {
            label: html::decode_entities(&category.name),
            url: Some(format!("/category/{}", category.id)),
        });
    }
    crumbs.push(Crumb {
        label: html::decode_entities(&product.name),
        url: None,
    });
    crumbs
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    fn product() -> Product {
        serde_json::from_value(json!({
            "id": 42,
            "name": "Brake disc &amp; pads",
            "price": "750000",
            "regular_price": "1000000",
            "sale_price": "750000",
            "on_sale": true,
            "stock_status": "instock",
            "categories": [{"id": 7, "name": "Brakes", "slug": "brakes"}],
            "images": [{"id": 1, "src": "https://shop.test/disc.jpg", "alt": ""}]
        }))
        .unwrap()
    }

    #[test]
    fn test_product_card() {
        let card = ProductCard::new(&product(), CurrencyCode::IRR);
        assert_eq!(card.name, "Brake disc & pads");
        assert_eq!(card.url, "/product/42");
        assert_eq!(card.price.as_deref(), Some("750,000 IRR"));
        assert_eq!(card.regular_price.as_deref(), Some("1,000,000 IRR"));
        assert_eq!(card.discount, 25);
        assert!(card.purchasable);
        assert_eq!(card.image.unwrap().alt, "Brake disc & pads");
    }

    #[test]
    fn test_product_card_without_sale() {
        let mut p = product();
        p.on_sale = false;
        p.price = Some(Decimal::new(1_000_000, 0));
        let card = ProductCard::new(&p, CurrencyCode::IRR);
        assert_eq!(card.regular_price, None);
        assert_eq!(card.discount, 0);
    }

    #[test]
    fn test_breadcrumbs_include_category() {
        let crumbs = breadcrumbs(&product());
        let labels: Vec<&str> = crumbs.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Home", "Products", "Brakes", "Brake disc & pads"]);
        assert_eq!(crumbs[2].url.as_deref(), Some("/category/7"));
        assert_eq!(crumbs[3].url, None);
    }
}
