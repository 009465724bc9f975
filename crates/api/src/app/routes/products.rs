use std::sync::Arc;

use axum::{Router, http::Method, routing::MethodRouter};

use storegate_auth::Permission;

use crate::app::dto::{self, CreateProductRequest, ListProductsQuery};
use crate::app::services::AppServices;
use crate::config::{ActionConfig, RateLimitPolicy};
use crate::context::RouteContext;
use crate::route::reject_other_methods;

pub fn router(services: &Arc<AppServices>) -> Router {
    let gate = &services.gate;

    let catalog = services.clone();
    let list = gate.route(
        Method::GET,
        ActionConfig::public("products.list")
            .rate_limit(RateLimitPolicy::new("products:list").max(60)),
        dto::list_products_schema(),
        move |q: ListProductsQuery, _ctx: RouteContext| {
            let services = catalog.clone();
            async move { Ok(services.catalog.page(q.page, q.limit, q.category.as_deref())) }
        },
    );

    let catalog = services.clone();
    let create = gate.route(
        Method::POST,
        ActionConfig::with_permissions("products.create", [Permission::ProductsCreate]),
        dto::create_product_schema(),
        move |req: CreateProductRequest, ctx: RouteContext| {
            let services = catalog.clone();
            async move {
                let product = services.catalog.create(req)?;
                tracing::info!(product_id = %product.id, user_id = ?ctx.action.user_id, "product created");
                Ok(product)
            }
        },
    );

    Router::new().route(
        "/",
        reject_other_methods(
            create.mount(list.mount(MethodRouter::new())),
            vec![Method::GET, Method::POST],
        ),
    )
}
