//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use gadget_shop_core::Catalog;

use crate::config::StorefrontConfig;
use crate::db::StoredAccounts;
use crate::services::ShopService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the shop service and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    shop: ShopService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `catalog` - Initial catalog
    /// * `pool` - `PostgreSQL` connection pool, if a database is configured
    #[must_use]
    pub fn new(config: StorefrontConfig, catalog: Catalog, pool: Option<PgPool>) -> Self {
        Self::restore(config, catalog, pool, StoredAccounts::default())
    }

    /// Create application state around previously stored customers, carts
    /// and orders.
    #[must_use]
    pub fn restore(
        config: StorefrontConfig,
        catalog: Catalog,
        pool: Option<PgPool>,
        accounts: StoredAccounts,
    ) -> Self {
        let shop = ShopService::restore(catalog, pool.clone(), accounts);
        Self {
            inner: Arc::new(AppStateInner { config, pool, shop }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get a reference to the shop service.
    #[must_use]
    pub fn shop(&self) -> &ShopService {
        &self.inner.shop
    }
}
