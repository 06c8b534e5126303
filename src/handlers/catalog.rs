//! Read-only catalog passthrough. Documents are relayed as the store serves
//! them so the storefront sees the full media and variant shapes without
//! this service keeping up with the catalog schema.

use axum::{extract::State, routing::get, Router};

use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::state::AppState;
use crate::store::Page;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{product_id}", get(get_product))
        .route("/product-categories", get(list_product_categories))
        .route("/product-categories/{category_id}", get(get_product_category))
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Page<serde_json::Value>>> {
    Ok(Json(state.store.fetch_page("products").await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    Ok(Json(state.store.fetch_doc("products", product_id).await?))
}

pub async fn list_product_categories(
    State(state): State<AppState>,
) -> Result<Json<Page<serde_json::Value>>> {
    Ok(Json(state.store.fetch_page("product-categories").await?))
}

pub async fn get_product_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    Ok(Json(
        state.store.fetch_doc("product-categories", category_id).await?,
    ))
}
