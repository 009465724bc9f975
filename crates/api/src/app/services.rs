//! Service wiring for the HTTP app.

use std::sync::{Arc, RwLock};

use anyhow::Context;
use uuid::Uuid;

use storegate_auth::{InMemoryProfileStore, JwtSessionProvider, PrincipalResolver};
use storegate_core::{InMemoryRateLimitStore, RateLimitStore, RateLimiter};
use storegate_infra::PostgresProfileStore;

use crate::app::dto::{CreateProductRequest, ProductPage, ProductView};
use crate::config::ServerConfig;
use crate::gate::SecureGate;

/// Process-local product list backing the demo storefront routes.
#[derive(Debug, Default)]
pub struct Catalog {
    products: RwLock<Vec<ProductView>>,
}

impl Catalog {
    pub fn seeded() -> Self {
        let seed = [
            ("Espresso Cup", 12.5, "kitchen", 40),
            ("Pour-over Kettle", 49.0, "kitchen", 12),
            ("Linen Apron", 28.0, "textiles", 25),
        ];
        let products = seed
            .into_iter()
            .map(|(name, price, category, stock)| ProductView {
                id: Uuid::now_v7(),
                name: name.to_string(),
                price,
                category: Some(category.to_string()),
                stock,
            })
            .collect();
        Self {
            products: RwLock::new(products),
        }
    }

    pub fn page(&self, page: u32, limit: u32, category: Option<&str>) -> ProductPage {
        let products = self.products.read().map(|p| p.clone()).unwrap_or_default();
        let matching: Vec<ProductView> = products
            .into_iter()
            .filter(|p| category.is_none_or(|c| p.category.as_deref() == Some(c)))
            .collect();
        let start = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
        ProductPage {
            total: matching.len(),
            items: matching.into_iter().skip(start).take(limit as usize).collect(),
            page,
            limit,
        }
    }

    pub fn create(&self, req: CreateProductRequest) -> anyhow::Result<ProductView> {
        let product = ProductView {
            id: Uuid::now_v7(),
            name: req.name,
            price: req.price,
            category: req.category,
            stock: req.stock,
        };
        self.products
            .write()
            .map_err(|_| anyhow::anyhow!("catalog lock poisoned"))?
            .push(product.clone());
        Ok(product)
    }
}

/// Everything route handlers need.
pub struct AppServices {
    pub gate: SecureGate,
    pub catalog: Catalog,
    /// Profile edits made through the API.
    pub profiles: Arc<InMemoryProfileStore>,
}

impl AppServices {
    /// Wire sessions, profiles and rate-limit storage from `config`.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let mut sessions = JwtSessionProvider::hs256(config.jwt_secret.as_bytes());
        if let Some(aud) = &config.jwt_audience {
            sessions = sessions.with_audience(aud.clone());
        }

        let profiles = Arc::new(InMemoryProfileStore::new());
        let resolver = match &config.database_url {
            Some(url) => {
                let store = PostgresProfileStore::connect_lazy(url)
                    .context("failed to configure profile store")?;
                tracing::info!("profiles served from postgres");
                PrincipalResolver::new(Arc::new(sessions)).with_profiles(Arc::new(store))
            }
            None => PrincipalResolver::new(Arc::new(sessions)).with_profiles(profiles.clone()),
        };

        let limiter = RateLimiter::new(rate_limit_store(config)?);

        Ok(Self {
            gate: SecureGate::new(resolver, limiter),
            catalog: Catalog::seeded(),
            profiles,
        })
    }
}

#[cfg(feature = "redis")]
fn rate_limit_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn RateLimitStore>> {
    match &config.redis_url {
        Some(url) => {
            let store = storegate_infra::RedisRateLimitStore::new(url)
                .context("failed to configure redis rate-limit store")?;
            tracing::info!("rate limits stored in redis");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryRateLimitStore::new())),
    }
}

#[cfg(not(feature = "redis"))]
fn rate_limit_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn RateLimitStore>> {
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL set but built without the `redis` feature; using in-memory rate limits");
    }
    Ok(Arc::new(InMemoryRateLimitStore::new()))
}
