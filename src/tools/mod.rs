//! Function registry: the tool catalog and the dispatch table over it.

pub mod builtin;
pub mod schema;
pub mod traits;

pub use traits::{FnTool, Parameter, Tool, ToolArgs, ToolDefinition};

use crate::error::RegistryError;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on a single tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// One registered tool.
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    handler: Arc<dyn Tool>,
}

impl ToolDescriptor {
    /// Declared parameters absent from `args`, in declaration order.
    pub fn missing_parameters(&self, args: &ToolArgs) -> Vec<String> {
        self.parameters
            .iter()
            .filter(|p| !args.contains(&p.name))
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Catalog {
    order: Vec<Arc<ToolDescriptor>>,
    index: HashMap<String, usize>,
}

/// Registry of invokable tools.
///
/// Built once at startup and shared as `Arc<FunctionRegistry>`. Descriptors
/// are inserted whole under the write lock, so a concurrent dispatch sees
/// either the complete descriptor or none at all.
pub struct FunctionRegistry {
    catalog: RwLock<Catalog>,
    timeout: Duration,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TOOL_TIMEOUT)
    }

    /// Create a registry whose tool invocations are bounded by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            catalog: RwLock::new(Catalog::default()),
            timeout,
        }
    }

    /// Register a tool under `name`. Duplicate names are rejected.
    pub fn register<N, D, I, K, V>(
        &self,
        name: N,
        handler: Arc<dyn Tool>,
        description: D,
        parameters: I,
    ) -> Result<(), RegistryError>
    where
        N: Into<String>,
        D: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidDescriptor {
                name,
                reason: "tool name must not be empty".into(),
            });
        }

        let parameters: Vec<Parameter> = parameters
            .into_iter()
            .map(|(k, v)| Parameter::new(k, v))
            .collect();
        for (i, p) in parameters.iter().enumerate() {
            if parameters[..i].iter().any(|q| q.name == p.name) {
                return Err(RegistryError::InvalidDescriptor {
                    name,
                    reason: format!("parameter '{}' declared twice", p.name),
                });
            }
        }

        let descriptor = Arc::new(ToolDescriptor {
            name: name.clone(),
            description: description.into(),
            parameters,
            handler,
        });

        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        if catalog.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        let slot = catalog.order.len();
        catalog.order.push(descriptor);
        catalog.index.insert(name.clone(), slot);
        info!("Registered tool '{}'", name);
        Ok(())
    }

    /// Look up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        catalog.index.get(name).map(|&i| catalog.order[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        catalog.order.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The full catalog in registration order.
    pub fn describe_all(&self) -> Vec<ToolDefinition> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        catalog.order.iter().map(|d| d.definition()).collect()
    }

    /// Validate and invoke a tool, reporting failures as typed errors.
    ///
    /// The parameter check runs before the handler, so an incomplete call
    /// never produces side effects.
    pub async fn dispatch(&self, name: &str, args: &ToolArgs) -> Result<String, RegistryError> {
        // Clone the descriptor out so the lock is not held across the await.
        let descriptor = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;

        let missing = descriptor.missing_parameters(args);
        if !missing.is_empty() {
            return Err(RegistryError::MissingParameters {
                tool: name.to_string(),
                missing,
            });
        }

        debug!("Invoking tool '{}' with {} argument(s)", name, args.len());
        let invocation = AssertUnwindSafe(descriptor.handler.invoke(args)).catch_unwind();
        match tokio::time::timeout(self.timeout, invocation).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(e))) => Err(RegistryError::ToolExecution {
                tool: name.to_string(),
                detail: format!("{:#}", e),
            }),
            Ok(Err(panic)) => Err(RegistryError::ToolExecution {
                tool: name.to_string(),
                detail: format!("handler panicked: {}", panic_message(panic.as_ref())),
            }),
            Err(_) => Err(RegistryError::ToolExecution {
                tool: name.to_string(),
                detail: format!("timed out after {}s", self.timeout.as_secs()),
            }),
        }
    }

    /// Invoke a tool and always return a string: the handler's output on
    /// success, or an `Error: ...` message describing what went wrong.
    pub async fn call(&self, name: &str, args: &ToolArgs) -> String {
        match self.dispatch(name, args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool call '{}' failed: {}", name, e);
                e.to_result_string()
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("tools", &self.names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Records how often it ran and which keys it saw.
    struct Recorder {
        calls: AtomicU32,
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                seen: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Tool for Recorder {
        async fn invoke(&self, args: &ToolArgs) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = args.keys().map(String::from).collect();
            Ok("recorded".into())
        }
    }

    struct Sleeper;

    #[async_trait]
    impl Tool for Sleeper {
        async fn invoke(&self, _args: &ToolArgs) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("woke".into())
        }
    }

    fn args(v: serde_json::Value) -> ToolArgs {
        ToolArgs::new(v.as_object().cloned().unwrap())
    }

    fn no_params() -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    #[tokio::test]
    async fn test_dispatch_passes_extras_through() {
        let registry = FunctionRegistry::new();
        let rec = Recorder::new();
        registry
            .register("rec", rec.clone(), "records", [("a", "first"), ("b", "second")])
            .unwrap();

        let out = registry
            .call("rec", &args(json!({"a": "1", "b": "2", "extra": "3"})))
            .await;
        assert_eq!(out, "recorded");
        assert_eq!(rec.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*rec.seen.lock().unwrap(), vec!["a", "b", "extra"]);
    }

    #[tokio::test]
    async fn test_missing_parameters_never_invoke_handler() {
        let registry = FunctionRegistry::new();
        let rec = Recorder::new();
        registry
            .register("rec", rec.clone(), "records", [("a", "first"), ("b", "second")])
            .unwrap();

        let out = registry.call("rec", &args(json!({"b": "2"}))).await;
        assert_eq!(out, "Error: Missing required parameters: a for function rec");

        let err = registry.dispatch("rec", &ToolArgs::default()).await.unwrap_err();
        match err {
            RegistryError::MissingParameters { missing, .. } => assert_eq!(missing, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(rec.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = FunctionRegistry::new();
        let out = registry.call("nonexistent", &ToolArgs::default()).await;
        assert_eq!(out, "Error: Function 'nonexistent' not found in the registry.");
    }

    #[tokio::test]
    async fn test_handler_error_is_contained() {
        let registry = FunctionRegistry::new();
        registry
            .register(
                "explode",
                Arc::new(FnTool(|_: &ToolArgs| -> anyhow::Result<String> {
                    bail!("kaboom")
                })),
                "always fails",
                no_params(),
            )
            .unwrap();

        let out = registry.call("explode", &ToolArgs::default()).await;
        assert!(out.starts_with("Error: An error occurred while calling function 'explode'"));
        assert!(out.contains("kaboom"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let registry = Arc::new(FunctionRegistry::new());
        registry
            .register(
                "boom",
                Arc::new(FnTool(|a: &ToolArgs| -> anyhow::Result<String> {
                    let empty: Vec<u8> = Vec::new();
                    Ok(format!("{}", empty[a.len()]))
                })),
                "indexes past the end",
                no_params(),
            )
            .unwrap();

        let shared = registry.clone();
        let out = tokio::spawn(async move { shared.call("boom", &ToolArgs::default()).await })
            .await
            .expect("panic escaped the registry");
        assert!(out.starts_with("Error: An error occurred while calling function 'boom'"));
        assert!(out.contains("handler panicked: index out of bounds"));

        // The registry stays usable afterwards.
        assert!(registry.contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_tool_error() {
        let registry = FunctionRegistry::with_timeout(Duration::from_secs(5));
        registry
            .register("sleepy", Arc::new(Sleeper), "never returns", no_params())
            .unwrap();

        let out = registry.call("sleepy", &ToolArgs::default()).await;
        assert!(out.contains("'sleepy'"));
        assert!(out.contains("timed out after 5s"));
    }

    #[test]
    fn test_duplicate_and_invalid_registration() {
        let registry = FunctionRegistry::new();
        registry
            .register("rec", Recorder::new(), "first", no_params())
            .unwrap();
        let err = registry
            .register("rec", Recorder::new(), "second", no_params())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(ref n) if n == "rec"));
        // First registration is untouched.
        assert_eq!(registry.get("rec").unwrap().description, "first");

        assert!(matches!(
            registry.register("", Recorder::new(), "blank", no_params()),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
        assert!(matches!(
            registry.register("twice", Recorder::new(), "dup", [("x", "a"), ("x", "b")]),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_describe_all_keeps_registration_order() {
        let registry = FunctionRegistry::new();
        for name in ["web_search", "calculate", "web_scraper"] {
            registry
                .register(name, Recorder::new(), format!("{name} tool"), [("q", "query")])
                .unwrap();
        }
        let defs = registry.describe_all();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["web_search", "calculate", "web_scraper"]);
        assert_eq!(defs[1].parameters, vec![Parameter::new("q", "query")]);
        assert_eq!(registry.names().len(), 3);
    }
}
