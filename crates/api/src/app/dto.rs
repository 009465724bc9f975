use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storegate_core::{Checks, Dto, Validate, ValidationError, dto, from_str_or_value};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default = "default_page", deserialize_with = "from_str_or_value")]
    pub page: u32,
    #[serde(default = "default_limit", deserialize_with = "from_str_or_value")]
    pub limit: u32,
    pub category: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Validate for ListProductsQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut checks = Checks::new();
        checks
            .ensure(self.page >= 1, "page", "Number must be greater than or equal to 1")
            .ensure(self.limit >= 1, "limit", "Number must be greater than or equal to 1")
            .ensure(self.limit <= 100, "limit", "Number must be less than or equal to 100");
        if let Some(category) = &self.category {
            checks.length(category, "category", 1, 100);
        }
        checks.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: f64,
    pub category: Option<String>,
    #[serde(default)]
    pub stock: i64,
}

impl Validate for CreateProductRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut checks = Checks::new();
        checks
            .length(&self.name, "name", 1, 200)
            .ensure(
                self.price.is_finite() && self.price >= 0.0,
                "price",
                "Number must be greater than or equal to 0",
            )
            .ensure(self.stock >= 0, "stock", "Number must be greater than or equal to 0");
        checks.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

impl Validate for UpdateOrderStatusRequest {}

/// Strict: unknown keys (say `role`) are rejected rather than ignored.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut checks = Checks::new();
        checks.length(&self.user_id, "userId", 1, 255);
        for (path, value, max) in [
            ("firstName", &self.first_name, 100),
            ("lastName", &self.last_name, 100),
            ("avatarUrl", &self.avatar_url, 2048),
        ] {
            if let Some(value) = value {
                checks.length(value, path, 0, max);
            }
        }
        checks.finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub role: String,
    pub permission: String,
}

impl Validate for ExplainQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut checks = Checks::new();
        checks
            .ensure(!self.role.is_empty(), "role", "Required")
            .ensure(!self.permission.is_empty(), "permission", "Required");
        checks.finish()
    }
}

// -------------------------
// Schemas
// -------------------------

pub fn list_products_schema() -> Dto<ListProductsQuery> {
    dto()
}

pub fn create_product_schema() -> Dto<CreateProductRequest> {
    dto()
}

pub fn update_order_status_schema() -> Dto<UpdateOrderStatusRequest> {
    dto()
}

pub fn update_profile_schema() -> Dto<UpdateProfileRequest> {
    dto()
}

pub fn explain_schema() -> Dto<ExplainQuery> {
    dto()
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub category: Option<String>,
    pub stock: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub items: Vec<ProductView>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusChanged {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub updated_by: Option<String>,
}
