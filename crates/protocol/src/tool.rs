//! Tool registry: the set of callable tools this server exposes over `tools/list`/`tools/call`.

use async_trait::async_trait;
use mcpguard_error::AppError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Static shape of a tool, as returned by `tools/list`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Something that can describe itself and execute on demand.
///
/// Implementations are registered once at startup and then called concurrently from many
/// request handlers; they must be `Send + Sync` and should not assume exclusive access to any
/// state they close over.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, AppError>;
}

/// Concurrent name -> provider map.
///
/// Mirrors the shape of a tool cache: registration is rare (startup), lookups and listing are
/// frequent (every request), so reads never block each other.
#[derive(Default)]
pub struct ToolRegistry {
    providers: RwLock<HashMap<String, Arc<dyn ToolProvider>>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `name`. Fails if `name` is blank or already taken: a duplicate
    /// registration almost always means two providers were wired up for the same tool by
    /// mistake, and silently letting the second one win would hide that.
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn ToolProvider>) -> Result<(), AppError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::bad_request("tool_register", "tool name must not be empty"));
        }

        let mut providers = self.providers.write();
        if providers.contains_key(&name) {
            return Err(
                AppError::bad_request("tool_register", "tool already registered").with_context("name", &name),
            );
        }
        providers.insert(name, provider);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ToolProvider>, AppError> {
        self.providers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found("tool_get", "unknown tool").with_context("name", name))
    }

    /// Snapshot of every registered tool's definition, in no particular order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.providers.read().values().map(|p| p.definition()).collect()
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
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolProvider for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "returns its input unchanged".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, AppError> {
            Ok(arguments)
        }
    }

    #[test]
    fn register_rejects_blank_name() {
        let registry = ToolRegistry::new();
        let err = registry.register("  ", Arc::new(Echo)).unwrap_err();
        assert_eq!(err.kind, mcpguard_error::ErrorKind::BadRequest);
    }

    #[test]
    fn register_rejects_duplicate() {
        let registry = ToolRegistry::new();
        registry.register("echo", Arc::new(Echo)).unwrap();
        let err = registry.register("echo", Arc::new(Echo)).unwrap_err();
        assert_eq!(err.kind, mcpguard_error::ErrorKind::BadRequest);
    }

    #[test]
    fn get_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.get("missing").unwrap_err();
        assert_eq!(err.kind, mcpguard_error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn registered_tool_executes() {
        let registry = ToolRegistry::new();
        registry.register("echo", Arc::new(Echo)).unwrap();
        let tool = registry.get("echo").unwrap();
        let result = tool.execute(json!({"a": 1})).await.unwrap();
        assert_eq!(result, json!({"a": 1}));
    }

    #[test]
    fn list_reflects_registrations() {
        let registry = ToolRegistry::new();
        assert!(registry.list().is_empty());
        registry.register("echo", Arc::new(Echo)).unwrap();
        let defs = registry.list();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }
}
