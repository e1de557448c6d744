//! Resource registry: the set of readable resources this server exposes over
//! `resources/list`/`resources/read`.

use async_trait::async_trait;
use mcpguard_error::AppError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Static shape of a resource, as returned by `resources/list`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// The body returned by `resources/read`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

#[async_trait]
pub trait ResourceProvider: Send + Sync {
    fn definition(&self) -> ResourceDefinition;

    async fn read(&self) -> Result<ResourceContent, AppError>;
}

/// Concurrent URI -> provider map, keyed the same way [`crate::tool::ToolRegistry`] keys on name.
#[derive(Default)]
pub struct ResourceRegistry {
    providers: RwLock<HashMap<String, Arc<dyn ResourceProvider>>>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, uri: impl Into<String>, provider: Arc<dyn ResourceProvider>) -> Result<(), AppError> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(AppError::bad_request("resource_register", "resource uri must not be empty"));
        }

        let mut providers = self.providers.write();
        if providers.contains_key(&uri) {
            return Err(
                AppError::bad_request("resource_register", "resource already registered")
                    .with_context("uri", &uri),
            );
        }
        providers.insert(uri, provider);
        Ok(())
    }

    pub fn get(&self, uri: &str) -> Result<Arc<dyn ResourceProvider>, AppError> {
        self.providers
            .read()
            .get(uri)
            .cloned()
            .ok_or_else(|| AppError::not_found("resource_get", "unknown resource").with_context("uri", uri))
    }

    #[must_use]
    pub fn list(&self) -> Vec<ResourceDefinition> {
        self.providers.read().values().map(|p| p.definition()).collect()
    }

    /// Look the provider up, then read it with the registry lock released: a slow or misbehaving
    /// provider must never be able to block every other lookup.
    pub async fn read(&self, uri: &str) -> Result<ResourceContent, AppError> {
        let provider = self.get(uri)?;
        provider
            .read()
            .await
            .map_err(|err| err.with_context("uri", uri))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Static;

    #[async_trait]
    impl ResourceProvider for Static {
        fn definition(&self) -> ResourceDefinition {
            ResourceDefinition {
                uri: "file:///readme.txt".to_string(),
                name: "readme".to_string(),
                description: Some("project readme".to_string()),
                mime_type: Some("text/plain".to_string()),
            }
        }

        async fn read(&self) -> Result<ResourceContent, AppError> {
            Ok(ResourceContent {
                uri: "file:///readme.txt".to_string(),
                mime_type: "text/plain".to_string(),
                text: "hello".to_string(),
            })
        }
    }

    #[test]
    fn register_rejects_duplicate() {
        let registry = ResourceRegistry::new();
        registry.register("file:///readme.txt", Arc::new(Static)).unwrap();
        let err = registry
            .register("file:///readme.txt", Arc::new(Static))
            .unwrap_err();
        assert_eq!(err.kind, mcpguard_error::ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn read_unknown_resource_is_not_found() {
        let registry = ResourceRegistry::new();
        let err = registry.read("missing").await.unwrap_err();
        assert_eq!(err.kind, mcpguard_error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn read_returns_provider_content() {
        let registry = ResourceRegistry::new();
        registry.register("file:///readme.txt", Arc::new(Static)).unwrap();
        let content = registry.read("file:///readme.txt").await.unwrap();
        assert_eq!(content.text, "hello");
    }

    #[test]
    fn list_reflects_registrations() {
        let registry = ResourceRegistry::new();
        registry.register("file:///readme.txt", Arc::new(Static)).unwrap();
        assert_eq!(registry.list().len(), 1);
    }
}
