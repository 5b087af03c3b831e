//! JSON-over-stdio protocol between the host and a module process.
//!
//! The host writes a single request line to the module's stdin and closes it.
//! The module answers with a response object on the last non-empty line of
//! stdout; anything printed before that line is passed through to the user.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModuleError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PluginRequest {
    /// Ask the module for its export tree.
    Describe,
    /// Construct the export at `export` with `options` and run `action`.
    Invoke {
        export: Vec<String>,
        action: String,
        options: Map<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginResponse {
    pub fn into_result(self) -> Result<Value, ModuleError> {
        if self.ok {
            Ok(self.result)
        } else {
            Err(ModuleError::Failed(
                self.error
                    .unwrap_or_else(|| "module reported an unspecified error".to_string()),
            ))
        }
    }
}

/// Module stdout split into passthrough lines and the final response.
#[derive(Debug)]
pub struct ParsedOutput<'a> {
    pub passthrough: Vec<&'a str>,
    pub response: Option<PluginResponse>,
}

/// Split module stdout. Returns no response when stdout is empty.
pub fn parse_output(stdout: &str) -> Result<ParsedOutput<'_>, ModuleError> {
    let mut lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
    let Some(last) = lines.pop() else {
        return Ok(ParsedOutput {
            passthrough: Vec::new(),
            response: None,
        });
    };

    let response = serde_json::from_str(last.trim())
        .map_err(|e| ModuleError::InvalidResponse(format!("{e}: {last}")))?;
    Ok(ParsedOutput {
        passthrough: lines,
        response: Some(response),
    })
}
