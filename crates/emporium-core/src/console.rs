//! Console composition root
//!
//! Owns one session manager and one variant workstation. Catalog calls go
//! through the session manager so every one of them gets refresh-and-retry.

use std::sync::Arc;
use tokio::sync::mpsc;

use emporium_api::{ChannelNavigator, HttpClient, Navigator, ReqwestTransport};
use emporium_catalog::{CatalogClient, VariantWorkstation};
use emporium_session::{SessionManager, SessionSnapshot};

use crate::config::Config;
use crate::Result;

#[derive(Clone)]
pub struct Console {
    config: Config,
    session: SessionManager,
    workstation: VariantWorkstation,
}

impl Console {
    /// Build with the reqwest transport. Redirect destinations arrive on the
    /// returned receiver; the shell performs the actual navigation.
    pub fn new(config: Config) -> Result<(Self, mpsc::UnboundedReceiver<String>)> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        let (navigator, redirects) = ChannelNavigator::new();
        let console = Self::with_parts(config, Arc::new(transport), Arc::new(navigator))?;
        Ok((console, redirects))
    }

    pub fn with_parts(
        config: Config,
        client: Arc<dyn HttpClient>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let session = SessionManager::new(client, navigator, config.session_endpoints()?);
        let catalog = CatalogClient::new(Arc::new(session.clone()), config.catalog_endpoints()?);
        let workstation = VariantWorkstation::new(catalog);

        Ok(Self {
            config,
            session,
            workstation,
        })
    }

    /// Run the session check and, when signed in, load the product list.
    pub async fn initialize(&self) -> SessionSnapshot {
        let snapshot = self.session.init().await;

        if snapshot.is_authenticated {
            if let Err(e) = self.workstation.load_products().await {
                tracing::warn!(error = %e, "Initial product load failed");
            }
        }

        tracing::info!(
            api = %self.config.api_base_url,
            authenticated = snapshot.is_authenticated,
            "Console initialized"
        );
        snapshot
    }

    pub fn dispose(&self) {
        self.workstation.dispose();
        self.session.dispose();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn workstation(&self) -> &VariantWorkstation {
        &self.workstation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_api::testing::{RecordingNavigator, ScriptedTransport};
    use emporium_api::Method;
    use emporium_catalog::{CatalogError, ProductKey};
    use serde_json::json;

    fn console() -> (Console, Arc<ScriptedTransport>, Arc<RecordingNavigator>) {
        let transport = Arc::new(ScriptedTransport::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let config = Config::new("https://shop.example.com".parse().unwrap());
        let console = Console::with_parts(config, transport.clone(), navigator.clone()).unwrap();
        (console, transport, navigator)
    }

    fn products_body() -> serde_json::Value {
        json!({
            "success": true,
            "data": { "products": [{
                "_id": "p1",
                "name": "Tee",
                "totalStock": 3,
                "variants": [{ "_id": "v1", "sku": "TEE", "price": 10, "stock": 3, "isDefault": true }]
            }] }
        })
    }

    #[tokio::test]
    async fn test_initialize_loads_products_when_signed_in() {
        let (console, transport, _) = console();
        transport.respond_json(
            Method::Get,
            "/api/auth/validate",
            200,
            json!({ "success": true, "data": { "user": { "id": "u1" } } }),
        );
        transport.respond_json(Method::Get, "/api/products", 200, products_body());

        let snapshot = console.initialize().await;

        assert!(snapshot.is_authenticated);
        assert_eq!(console.workstation().products().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_signed_out_skips_products() {
        let (console, transport, navigator) = console();
        transport.respond_json(Method::Get, "/api/auth/validate", 200, json!({ "success": false }));

        let snapshot = console.initialize().await;

        assert!(!snapshot.is_authenticated);
        assert_eq!(transport.count(Method::Get, "/api/products"), 0);
        assert_eq!(navigator.count(), 0);
    }

    #[tokio::test]
    async fn test_catalog_calls_refresh_the_session() {
        let (console, transport, navigator) = console();
        transport.respond_json(
            Method::Get,
            "/api/auth/validate",
            200,
            json!({ "success": true, "data": { "user": { "id": "u1" } } }),
        );
        transport
            .respond_json(Method::Get, "/api/products", 200, products_body())
            .respond_json(Method::Get, "/api/products", 200, products_body());
        console.initialize().await;

        transport
            .respond_json(Method::Patch, "/api/variants/v1", 401, json!({}))
            .respond_json(Method::Patch, "/api/variants/v1", 200, json!({ "success": true }));
        transport.respond_json(Method::Post, "/api/auth/refresh", 200, json!({ "success": true }));

        let edit = emporium_catalog::VariantEdit {
            stock: Some(8),
            ..Default::default()
        };
        let updated = console.workstation().submit_variant_edit("v1", edit).await.unwrap();

        assert_eq!(updated.stock, 8);
        assert_eq!(
            console.workstation().product(&ProductKey::persisted("p1")).unwrap().total_stock,
            8
        );
        assert_eq!(transport.count(Method::Patch, "/api/variants/v1"), 2);
        assert_eq!(navigator.count(), 0);
    }

    #[tokio::test]
    async fn test_expired_session_redirects_and_fails_the_call() {
        let (console, transport, navigator) = console();
        transport.respond_json(Method::Get, "/api/products", 401, json!({}));
        transport.respond_json(Method::Post, "/api/auth/refresh", 401, json!({}));

        let result = console.workstation().load_products().await;

        assert!(matches!(result, Err(CatalogError::Unauthenticated)));
        assert_eq!(navigator.redirects(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn test_dispose_stops_both_components() {
        let (console, _, _) = console();
        console.dispose();

        assert!(matches!(
            console.workstation().load_products().await,
            Err(CatalogError::Disposed)
        ));
    }
}
