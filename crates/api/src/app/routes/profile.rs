use std::sync::Arc;

use axum::{Router, http::Method};

use storegate_auth::{Permission, Profile};

use crate::app::dto::{self, UpdateProfileRequest};
use crate::app::services::AppServices;
use crate::config::ActionConfig;
use crate::context::RouteContext;

/// `PUT /api/profile`: user managers may edit anyone, everyone else only themselves.
pub fn router(services: &Arc<AppServices>) -> Router {
    let profiles = services.profiles.clone();
    let update = services.gate.route(
        Method::PUT,
        ActionConfig::with_permissions("profile.update", [Permission::UsersManage])
            .allow_self("userId"),
        dto::update_profile_schema(),
        move |req: UpdateProfileRequest, _ctx: RouteContext| {
            let profiles = profiles.clone();
            async move {
                let profile = Profile {
                    first_name: req.first_name.unwrap_or_default(),
                    last_name: req.last_name.unwrap_or_default(),
                    avatar_url: req.avatar_url,
                };
                profiles.upsert(req.user_id.as_str(), profile.clone());
                Ok(profile)
            }
        },
    );

    Router::new().route("/", update.into_method_router())
}
