//! Client for the headless CMS that owns the product catalog and order
//! collection. All requests authenticate with the store's API key scheme.

use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::error::{AppError, Result};
use crate::models::{CreateOrder, Order, Product};

/// Paginated collection envelope as the store returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: i64,
    pub total_pages: i64,
    pub page: i64,
    pub limit: i64,
    pub paging_counter: i64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    #[serde(default)]
    pub prev_page: Option<i64>,
    #[serde(default)]
    pub next_page: Option<i64>,
}

/// Create responses wrap the new document alongside a human-readable message.
#[derive(Debug, Deserialize)]
struct CreatedDoc<T> {
    doc: T,
}

#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    pub fn new(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn auth_value(&self) -> String {
        format!("users API-Key {}", self.api_key)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, endpoint))
            .header(header::AUTHORIZATION, self.auth_value())
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Order store request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("No document at {}", endpoint)));
        }
        if !status.is_success() {
            return Err(store_request_failed(status, endpoint));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse store response: {}", e)))
    }

    /// Fetch one page of a collection, documents as raw JSON.
    pub async fn fetch_page<T: DeserializeOwned>(&self, collection: &str) -> Result<Page<T>> {
        self.get_json(&format!("/api/{}", collection), &[]).await
    }

    /// Fetch a single document by id.
    pub async fn fetch_doc<T: DeserializeOwned>(&self, collection: &str, id: i64) -> Result<T> {
        self.get_json(&format!("/api/{}/{}", collection, id), &[])
            .await
    }

    pub async fn fetch_product(&self, id: i64) -> Result<Product> {
        self.fetch_doc("products", id).await
    }

    /// Look up an order by the checkout session that produced it.
    pub async fn find_order_by_session(&self, session_id: &str) -> Result<Option<Order>> {
        let page: Page<Order> = self
            .get_json(
                "/api/orders",
                &[
                    ("where[stripeSessionId][equals]", session_id),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(page.docs.into_iter().next())
    }

    /// Create an order. A rejection caused by the session id uniqueness
    /// constraint comes back as `DuplicateOrder` so callers can treat the
    /// replay as already-done.
    pub async fn create_order(&self, order: &CreateOrder) -> Result<Order> {
        let endpoint = "/api/orders";
        let response = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .header(header::AUTHORIZATION, self.auth_value())
            .json(order)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Order store request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let created: CreatedDoc<Order> = response.json().await.map_err(|e| {
                AppError::Internal(format!("Failed to parse store response: {}", e))
            })?;
            return Ok(created.doc);
        }

        let body = response.text().await.unwrap_or_default();
        if is_unique_violation(status, &body) {
            return Err(AppError::DuplicateOrder {
                session_id: order.stripe_session_id.clone(),
            });
        }

        tracing::error!(
            "Order store rejected order for session {}: {} {}",
            order.stripe_session_id,
            status,
            body
        );
        Err(store_request_failed(status, endpoint))
    }
}

/// The store reports the `stripeSessionId` uniqueness violation either as a
/// conflict or as a validation error that names the constraint.
fn is_unique_violation(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT
        || (status == StatusCode::BAD_REQUEST && body.to_ascii_lowercase().contains("unique"))
}

fn store_request_failed(status: StatusCode, endpoint: &str) -> AppError {
    AppError::StoreRequestFailed {
        status: status.as_u16(),
        status_text: status
            .canonical_reason()
            .unwrap_or("Unknown status")
            .to_string(),
        endpoint: endpoint.to_string(),
    }
}
