//! Routes for the Product resource.
//!
//! Handlers translate HTTP into product commands and queries and send them
//! through the dispatcher. Each request runs under a child of the server's
//! shutdown token.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use catalog_products::application::query_handlers::ProductView;
use catalog_products::domain::commands::{CreateProduct, DeleteProduct, UpdateProduct};
use catalog_products::domain::queries::{GetAllProducts, GetProductById};

use crate::error::ApiError;
use crate::state::AppState;

/// Collection path.
pub const PRODUCTS_PATH: &str = "/api/products";

const DEFAULT_PAGE_NUMBER: i64 = 1;
const DEFAULT_PAGE_SIZE: i64 = 10;

/// Request body for create and update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    /// Product name.
    pub name: String,
    /// Unit price.
    pub unit_price: f64,
}

/// Query string for the list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    /// 1-based page number.
    pub page_number: Option<i64>,
    /// Products per page.
    pub page_size: Option<i64>,
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// The payload.
    pub data: T,
    /// Short description of the outcome.
    pub message: String,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: message.into(),
        })
    }
}

/// Success envelope for one page of products.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Items on this page.
    pub data: Vec<T>,
    /// Short description of the outcome.
    pub message: String,
    /// 1-based page number.
    pub page_number: u64,
    /// Page size.
    pub page_size: u64,
    /// Items across all pages.
    pub total_count: u64,
    /// `ceil(total_count / page_size)`.
    pub total_pages: u64,
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("product {id} not found"))
}

/// POST /api/products
#[instrument(skip(state, request), fields(name = %request.name))]
async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<ProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateProduct {
        name: request.name,
        unit_price: request.unit_price,
    };

    let product = state
        .dispatcher
        .dispatch(command, &state.request_token())
        .await?;

    info!(product_id = %product.id, "product created");
    let location = format!("{PRODUCTS_PATH}/{}", product.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        ApiResponse::ok(product, "product created"),
    ))
}

/// GET /api/products/{id}
#[instrument(skip(state))]
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductView>>, ApiError> {
    let product = state
        .dispatcher
        .dispatch(GetProductById { id }, &state.request_token())
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(ApiResponse::ok(product, "product retrieved"))
}

/// GET /api/products?pageNumber=&pageSize=
#[instrument(skip(state))]
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PagedResponse<ProductView>>, ApiError> {
    let query = GetAllProducts {
        page_number: params.page_number.unwrap_or(DEFAULT_PAGE_NUMBER),
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };

    let page = state
        .dispatcher
        .dispatch(query, &state.request_token())
        .await?;
    if page.items.is_empty() {
        return Err(ApiError::NotFound("no products found".into()));
    }

    let total_pages = page.total_pages();
    Ok(Json(PagedResponse {
        success: true,
        data: page.items,
        message: "products retrieved".into(),
        page_number: page.page_number,
        page_size: page.page_size,
        total_count: page.total_count,
        total_pages,
    }))
}

/// PUT /api/products/{id}
#[instrument(skip(state, request))]
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ProductRequest>,
) -> Result<Json<ApiResponse<ProductView>>, ApiError> {
    let command = UpdateProduct {
        id,
        name: request.name,
        unit_price: request.unit_price,
    };

    let product = state
        .dispatcher
        .dispatch(command, &state.request_token())
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(ApiResponse::ok(product, "product updated"))
}

/// DELETE /api/products/{id}
#[instrument(skip(state))]
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .dispatcher
        .dispatch(DeleteProduct { id }, &state.request_token())
        .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// Returns the router for the product resource.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(PRODUCTS_PATH, get(list_products).post(create_product))
        .route(
            &format!("{PRODUCTS_PATH}/{{id}}"),
            get(get_product).put(update_product).delete(delete_product),
        )
}
