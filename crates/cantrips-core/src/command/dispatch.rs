use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CantripsConfig;
use crate::error::DispatchError;
use crate::plugin::ActionInvocation;
use crate::registry::ModuleRegistry;

/// Action timeout when neither the invocation nor the module sets one.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Option carrying the per-invocation timeout in milliseconds.
pub const TIMEOUT_OPTION: &str = "timeout";

/// Keys the command-line layer adds that never reach a module.
const FRAMEWORK_KEYS: [&str; 3] = ["_", "$0", "help"];

/// Runs module actions against the registry.
pub struct Dispatcher<'a> {
    registry: &'a ModuleRegistry,
    config: &'a CantripsConfig,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a ModuleRegistry, config: &'a CantripsConfig) -> Self {
        Self { registry, config }
    }

    /// Run `action` of `module` with the raw command-line options.
    ///
    /// The action races a timer. When the timer wins the action task is
    /// detached, not cancelled.
    pub async fn dispatch(
        &self,
        module: &str,
        action: &str,
        raw_options: Map<String, Value>,
    ) -> Result<Value, DispatchError> {
        let registered = self
            .registry
            .get(module)
            .ok_or_else(|| DispatchError::UnknownModule(module.to_string()))?;

        if !registered.exposed.contains(action) {
            return Err(DispatchError::InvalidAction {
                module: module.to_string(),
                action: action.to_string(),
            });
        }

        let options = merge_options(self.config.settings_for(module), clean_options(raw_options));
        let timeout_ms = resolve_timeout(&options, registered.meta.timeout).map_err(|value| {
            DispatchError::InvalidTimeout {
                module: module.to_string(),
                action: action.to_string(),
                value,
            }
        })?;

        let logged_options = Value::Object(options.clone());
        debug!(
            module = %module,
            action = %action,
            timeout_ms,
            options = %logged_options,
            "Running command"
        );

        let invocation = ActionInvocation {
            export_path: registered.export_path.clone(),
            action: action.to_string(),
            options,
        };
        let runtime = registered.runtime.clone();
        let task = tokio::spawn(async move { runtime.invoke(invocation).await });

        tokio::select! {
            joined = task => match joined {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => Err(DispatchError::Action {
                    module: module.to_string(),
                    action: action.to_string(),
                    source,
                }),
                Err(err) => Err(DispatchError::Aborted {
                    module: module.to_string(),
                    action: action.to_string(),
                    reason: err.to_string(),
                }),
            },
            _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => {
                warn!(module = %module, action = %action, timeout_ms, "Action timed out");
                Err(DispatchError::Timeout {
                    module: module.to_string(),
                    action: action.to_string(),
                    timeout_ms,
                })
            }
        }
    }
}

/// Drop framework keys and falsy values (null, false, "", 0).
pub fn clean_options(raw: Map<String, Value>) -> Map<String, Value> {
    raw.into_iter()
        .filter(|(key, value)| !FRAMEWORK_KEYS.contains(&key.as_str()) && !is_falsy(value))
        .collect()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Module settings overlaid with invocation options.
pub fn merge_options(
    settings: Map<String, Value>,
    options: Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = settings;
    merged.extend(options);
    merged
}

/// Timeout from the `timeout` option, else the module default, else [`DEFAULT_TIMEOUT_MS`].
///
/// Returns the offending value as text when the option is not a positive integer.
pub fn resolve_timeout(
    options: &Map<String, Value>,
    module_default: Option<u64>,
) -> Result<u64, String> {
    let Some(value) = options.get(TIMEOUT_OPTION) else {
        return Ok(module_default.unwrap_or(DEFAULT_TIMEOUT_MS));
    };

    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.filter(|ms| *ms > 0).ok_or_else(|| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
