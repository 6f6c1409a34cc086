//! HTTP implementation of the backend order-service contract.
//!
//! Thin `reqwest` wrapper: each method maps to one REST call and decodes the
//! response into the contract types. Error mapping follows the taxonomy in
//! [`ApiError`]: connection failures and timeouts become `Transport`, 404
//! becomes `NotFound`, 409 carries the structured completion-blocker body,
//! undecodable bodies become `InvalidResponse`.

use crate::{
    ApiError, ApiFuture, CompletionConflict, NewOrder, OrderApi, OrderFilters, PlacedOrder,
    TableInfo,
};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tableflow_orders::{Order, OrderId, OrderStatus, TableNumber};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// `OrderApi` over HTTP.
#[derive(Clone, Debug)]
pub struct HttpOrderApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrderApi {
    /// Creates a client against `base_url` with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::builder().base_url(base_url).build()
    }

    /// Creates a builder for customized construction.
    #[must_use]
    pub fn builder() -> HttpOrderApiBuilder {
        HttpOrderApiBuilder {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        decode(response).await
    }
}

/// Builder for [`HttpOrderApi`].
#[derive(Clone, Debug)]
pub struct HttpOrderApiBuilder {
    base_url: Option<String>,
    timeout: Duration,
}

impl HttpOrderApiBuilder {
    /// Sets the backend base URL (e.g. `https://api.example.com/v1`).
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when no base URL was given or the
    /// underlying client cannot be constructed.
    pub fn build(self) -> Result<HttpOrderApi, ApiError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Transport("no base URL configured".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(transport)?;
        Ok(HttpOrderApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn transport(error: reqwest::Error) -> ApiError {
    ApiError::Transport(error.to_string())
}

/// Shape of a 409 body: `{"customerName": ..., "activeOrders": [...]}`,
/// optionally wrapped with an error message.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConflictBody {
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    active_orders: Vec<Order>,
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|error| ApiError::InvalidResponse(error.to_string()));
    }

    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound {
            entity: "resource".to_string(),
        }),
        StatusCode::CONFLICT => match serde_json::from_str::<ConflictBody>(&body) {
            Ok(conflict) => Err(ApiError::CompletionBlocked(CompletionConflict {
                customer_name: conflict.customer_name.unwrap_or_default(),
                active_orders: conflict.active_orders,
            })),
            Err(error) => {
                tracing::warn!(%error, "conflict response body did not decode");
                Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message: body,
                })
            },
        },
        _ => Err(ApiError::Rejected {
            status: status.as_u16(),
            message: body,
        }),
    }
}

/// 204-style calls: success carries no meaningful body.
async fn decode_empty(response: Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound {
            entity: "resource".to_string(),
        }),
        _ => Err(ApiError::Rejected {
            status: status.as_u16(),
            message: body,
        }),
    }
}

#[derive(Serialize)]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Serialize)]
struct BulkStatusBody {
    order_ids: Vec<OrderId>,
    status: OrderStatus,
}

impl OrderApi for HttpOrderApi {
    fn create_order(&self, order: NewOrder) -> ApiFuture<'_, PlacedOrder> {
        Box::pin(async move {
            self.send_json(reqwest::Method::POST, "/orders", &order).await
        })
    }

    fn update_order_status(&self, id: OrderId, status: OrderStatus) -> ApiFuture<'_, Order> {
        Box::pin(async move {
            self.send_json(
                reqwest::Method::PATCH,
                &format!("/orders/{id}/status"),
                &StatusBody { status },
            )
            .await
        })
    }

    fn bulk_update_order_status(
        &self,
        ids: Vec<OrderId>,
        status: OrderStatus,
    ) -> ApiFuture<'_, Vec<Order>> {
        Box::pin(async move {
            self.send_json(
                reqwest::Method::PATCH,
                "/orders/status/bulk",
                &BulkStatusBody {
                    order_ids: ids,
                    status,
                },
            )
            .await
        })
    }

    fn delete_order(&self, id: OrderId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let response = self
                .client
                .delete(self.url(&format!("/orders/{id}")))
                .send()
                .await
                .map_err(transport)?;
            decode_empty(response).await
        })
    }

    fn search_orders(&self, filters: OrderFilters) -> ApiFuture<'_, Vec<Order>> {
        Box::pin(async move {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(status) = filters.status {
                query.push(("status", status.to_string()));
            }
            if let Some(table) = filters.table_id {
                query.push(("table_id", table.value().to_string()));
            }
            if let Some(from) = filters.date_from {
                query.push(("date_from", from.to_rfc3339()));
            }
            if let Some(to) = filters.date_to {
                query.push(("date_to", to.to_rfc3339()));
            }
            if let Some(text) = filters.query {
                query.push(("query", text));
            }
            self.get_json("/orders/search", &query).await
        })
    }

    fn get_order(&self, id: OrderId) -> ApiFuture<'_, Order> {
        Box::pin(async move { self.get_json(&format!("/orders/{id}"), &[]).await })
    }

    fn get_orders_by_table(&self, table: TableNumber) -> ApiFuture<'_, Vec<Order>> {
        Box::pin(async move {
            self.get_json(&format!("/tables/{}/orders", table.value()), &[])
                .await
        })
    }

    fn get_table_by_qr_code(&self, code: String) -> ApiFuture<'_, TableInfo> {
        Box::pin(async move {
            match self.get_json(&format!("/tables/qr/{code}"), &[]).await {
                Err(ApiError::NotFound { .. }) => Err(ApiError::NotFound {
                    entity: "QR code".to_string(),
                }),
                other => other,
            }
        })
    }

    fn fetch_tables(&self) -> ApiFuture<'_, Vec<TableInfo>> {
        Box::pin(async move { self.get_json("/tables", &[]).await })
    }
}
