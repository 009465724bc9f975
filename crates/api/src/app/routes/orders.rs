use std::sync::Arc;

use axum::{Router, http::Method};

use storegate_auth::{Permission, Role};

use crate::app::dto::{self, OrderStatusChanged, UpdateOrderStatusRequest};
use crate::app::services::AppServices;
use crate::config::ActionConfig;
use crate::context::RouteContext;

pub fn router(services: &Arc<AppServices>) -> Router {
    let update_status = services.gate.route(
        Method::PATCH,
        ActionConfig::with_permissions("orders.update_status", [Permission::OrdersUpdateStatus])
            .role(Role::Moderator),
        dto::update_order_status_schema(),
        |req: UpdateOrderStatusRequest, ctx: RouteContext| async move {
            Ok(OrderStatusChanged {
                order_id: req.order_id,
                status: req.status,
                updated_by: ctx.action.user_id.map(|id| id.to_string()),
            })
        },
    );

    Router::new().route("/status", update_status.into_method_router())
}
