//! Core tool abstractions: the [`Tool`] trait, the [`ToolSet`] dispatcher,
//! and the [`ToolError`] it reports.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::ToolDef;
use crate::error::ClinicError;

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;

// ── Errors ─────────────────────────────────────────────────────────

/// Failure of a single tool call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// The arguments did not match the tool's schema or request type.
    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The facade rejected the call. Carried through unchanged.
    #[error(transparent)]
    Failed(#[from] ClinicError),

    #[error("tool '{tool}' timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },
}

impl ToolError {
    /// Short machine-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::Failed(inner) => inner.kind(),
            ToolError::TimedOut { .. } => "timed_out",
        }
    }

    /// The structured payload returned to the model in place of a result.
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}

// ── Tool trait ─────────────────────────────────────────────────────

/// A tool the chat engine can invoke via function-calling.
///
/// Implementors provide a definition ([`Tool::definition`]) with the name,
/// description and JSON Schema parameters the model sees, and an async
/// [`Tool::execute`] that receives the raw JSON arguments and returns the
/// JSON-encoded result.
///
/// Uses a boxed future so that the trait is dyn-compatible.
pub trait Tool: Send + Sync {
    /// The tool definition sent to the LLM API.
    fn definition(&self) -> ToolDef;

    /// Execute the tool with the given raw JSON arguments string.
    fn execute(&self, arguments: &str) -> ToolFuture<'_>;

    /// The tool's name (convenience, delegates to definition).
    fn name(&self) -> String {
        self.definition().function.name
    }

    /// Whether this tool changes clinic records. Defaults to `false`.
    fn is_mutation(&self) -> bool {
        false
    }
}

// ── ToolSet ────────────────────────────────────────────────────────

/// A fixed collection of tools dispatched by name.
///
/// Built once with the builder methods and then shared behind an `Arc`;
/// nothing can be registered after construction.
///
/// ```ignore
/// let tools = ToolSet::new()
///     .with_arg_validation(true)
///     .with_default_timeout(Some(Duration::from_secs(30)))
///     .with(ListOwners::new(provider.clone()))
///     .with(ListVets::new(provider));
///
/// let defs = tools.definitions();
/// let reply = tools.execute("listOwners", "{}").await;
/// ```
pub struct ToolSet {
    tools: BTreeMap<String, Box<dyn Tool>>,
    /// Whether to validate tool arguments against JSON Schema before execution.
    validate_args: bool,
    /// Timeout for each tool call. `None` disables timeouts.
    default_timeout: Option<Duration>,
    /// Tool names that mutate state (populated from `Tool::is_mutation()`).
    mutation_tools: HashSet<String>,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("validate_args", &self.validate_args)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl ToolSet {
    /// Create an empty tool set.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            validate_args: false,
            default_timeout: None,
            mutation_tools: HashSet::new(),
        }
    }

    /// Enable JSON Schema argument validation before tool execution.
    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    /// Set a timeout applied to every tool call. Pass `None` to disable.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Register a tool (builder pattern). Replaces any tool with the same name.
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        let name = tool.name();
        if tool.is_mutation() {
            self.mutation_tools.insert(name.clone());
        }
        self.tools.insert(name, Box::new(tool));
        self
    }

    /// All tool definitions for the LLM API, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Whether a tool changes clinic records.
    pub fn is_mutation_tool(&self, tool_name: &str) -> bool {
        self.mutation_tools.contains(tool_name)
    }

    /// Run one tool call and return its typed outcome.
    ///
    /// Blank arguments are treated as `{}`. With validation enabled the
    /// arguments are checked against the tool's declared schema first.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let arguments = normalize_arguments(arguments);

        if self.validate_args {
            validate_tool_arguments(tool.as_ref(), arguments)?;
        }

        log_tool_call(name, arguments);
        let start = Instant::now();

        let result = match self.default_timeout {
            Some(limit) => match tokio::time::timeout(limit, tool.execute(arguments)).await {
                Ok(r) => r,
                Err(_) => {
                    info!(
                        "Tool {name} timed out after {:.1}s (limit: {:.0}s)",
                        start.elapsed().as_secs_f64(),
                        limit.as_secs_f64(),
                    );
                    Err(ToolError::TimedOut {
                        tool: name.to_string(),
                        timeout: limit,
                    })
                }
            },
            None => tool.execute(arguments).await,
        };

        debug!(
            "Tool {name} completed in {:.0}ms ({})",
            start.elapsed().as_secs_f64() * 1000.0,
            if result.is_ok() { "ok" } else { "error" }
        );
        result
    }

    /// Run one tool call and render the outcome for the model: the result
    /// JSON on success, a `{"error": {...}}` payload on failure.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        let rendered = match self.dispatch(name, arguments).await {
            Ok(value) => value.to_string(),
            Err(e) => {
                warn!("Tool {name} failed: {e}");
                e.to_payload().to_string()
            }
        };
        trace!("Tool {name} result: {rendered}");
        rendered
    }
}

impl Default for ToolSet {
    fn default() -> Self {
        Self::new()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn normalize_arguments(arguments: &str) -> &str {
    if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    }
}

/// Validate tool arguments against the tool's declared JSON Schema.
///
/// Every violation is listed in the error message so the model can correct
/// the whole call at once.
pub fn validate_tool_arguments(tool: &dyn Tool, arguments: &str) -> Result<(), ToolError> {
    let invalid = |message: String| ToolError::InvalidArguments {
        tool: tool.name(),
        message,
    };

    let args_value: Value = serde_json::from_str(normalize_arguments(arguments))
        .map_err(|e| invalid(format!("arguments are not valid JSON: {e}")))?;

    let schema = tool.definition().function.parameters;

    // If the schema itself is invalid, skip validation.
    let Ok(validator) = jsonschema::validator_for(&schema) else {
        return Ok(());
    };

    let errors: Vec<String> = validator
        .iter_errors(&args_value)
        .map(|e| format!("{}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(invalid(errors.join("; ")))
    }
}

/// Log a tool call at INFO level with a truncated preview of arguments.
pub fn log_tool_call(name: &str, arguments: &str) {
    let args_preview: String = arguments.chars().take(120).collect();
    info!(
        "[tool] {}({args_preview}{})",
        name,
        if arguments.chars().count() > 120 { "..." } else { "" }
    );
    debug!("[tool] {name} full args ({} bytes)", arguments.len());
    trace!("[tool] {name} arguments: {arguments}");
}

/// Decode raw JSON arguments into a tool's typed request.
pub fn parse_tool_args<T: serde::de::DeserializeOwned>(
    tool: &str,
    arguments: &str,
) -> Result<T, ToolError> {
    serde_json::from_str(normalize_arguments(arguments)).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Encode a tool's typed response.
pub fn to_tool_result<T: serde::Serialize>(response: &T) -> Result<Value, ToolError> {
    serde_json::to_value(response).map_err(|e| ToolError::Failed(e.into()))
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    impl Tool for EchoTool {
        fn definition(&self) -> ToolDef {
            ToolDef::new(
                "echo",
                "Echo the input",
                serde_json::json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            )
        }

        fn execute(&self, arguments: &str) -> ToolFuture<'_> {
            let parsed = parse_tool_args::<Value>("echo", arguments);
            Box::pin(async move {
                parsed.map(|args| args.get("text").cloned().unwrap_or(Value::Null))
            })
        }
    }

    struct MissingOwnerTool;

    impl Tool for MissingOwnerTool {
        fn definition(&self) -> ToolDef {
            ToolDef::new(
                "missing",
                "Always fails",
                serde_json::json!({"type": "object", "properties": {}}),
            )
        }

        fn execute(&self, _arguments: &str) -> ToolFuture<'_> {
            Box::pin(async {
                Err::<Value, _>(ClinicError::NotFound { entity: "owner", id: 7 }.into())
            })
        }

        fn is_mutation(&self) -> bool {
            true
        }
    }

    struct SlowTool;

    impl Tool for SlowTool {
        fn definition(&self) -> ToolDef {
            ToolDef::new("slow", "Sleeps", serde_json::json!({"type": "object"}))
        }

        fn execute(&self, _arguments: &str) -> ToolFuture<'_> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ToolError>(Value::Null)
            })
        }
    }

    #[test]
    fn tool_name_from_definition() {
        assert_eq!(EchoTool.name(), "echo");
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        let set = ToolSet::new().with(MissingOwnerTool).with(EchoTool);
        assert_eq!(set.len(), 2);
        let names: Vec<String> = set
            .definitions()
            .into_iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(names, vec!["echo", "missing"]);
        assert!(set.is_mutation_tool("missing"));
        assert!(!set.is_mutation_tool("echo"));
    }

    #[tokio::test]
    async fn dispatch_known_tool() {
        let set = ToolSet::new().with(EchoTool);
        let result = set.dispatch("echo", r#"{"text": "hello"}"#).await.unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn dispatch_unknown_tool() {
        let set = ToolSet::new().with(EchoTool);
        let err = set.dispatch("nonexistent", "{}").await.unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("nonexistent".into()));
    }

    #[tokio::test]
    async fn blank_arguments_are_empty_object() {
        let set = ToolSet::new().with(EchoTool);
        assert_eq!(set.dispatch("echo", "  ").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn facade_errors_pass_through_unchanged() {
        let set = ToolSet::new().with(MissingOwnerTool);
        let err = set.dispatch("missing", "{}").await.unwrap_err();
        assert_eq!(
            err,
            ToolError::Failed(ClinicError::NotFound { entity: "owner", id: 7 })
        );
    }

    #[tokio::test]
    async fn execute_renders_structured_error() {
        let set = ToolSet::new().with(MissingOwnerTool);
        let rendered = set.execute("missing", "{}").await;
        let payload: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(payload["error"]["kind"], "not_found");
        assert_eq!(payload["error"]["message"], "owner with id 7 not found");
    }

    #[tokio::test]
    async fn validation_lists_violations() {
        let set = ToolSet::new().with_arg_validation(true).with(EchoTool);
        let err = set.dispatch("echo", r#"{"text": 5}"#).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");

        let err = set.dispatch("echo", "not json").await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));

        assert!(set.dispatch("echo", r#"{"text": "ok"}"#).await.is_ok());
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let set = ToolSet::new()
            .with_default_timeout(Some(Duration::from_millis(20)))
            .with(SlowTool);
        let err = set.dispatch("slow", "{}").await.unwrap_err();
        assert_eq!(err.kind(), "timed_out");
    }

    #[test]
    fn parse_tool_args_reports_decode_failure() {
        let err = parse_tool_args::<Vec<i32>>("listOwners", r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref tool, .. } if tool == "listOwners"));
    }
}
