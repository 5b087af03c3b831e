use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::protocol::{PluginRequest, parse_output};
use super::{ActionInvocation, LoadedModule, ModuleLoader, ModuleRuntime};
use crate::error::{ModuleError, ResolutionError};
use crate::models::{ModuleManifest, ResolvedModule};

/// Environment variable carrying the module directory to the module process.
pub const MODULE_DIR_ENV: &str = "CANTRIPS_MODULE_DIR";

/// Runs a module's entry point once per request.
#[derive(Debug, Clone)]
pub struct ProcessModuleRuntime {
    program: PathBuf,
    args: Vec<String>,
    module_dir: PathBuf,
}

impl ProcessModuleRuntime {
    pub fn new(manifest: &ModuleManifest, module_dir: &Path) -> Self {
        Self {
            program: manifest.entry.program(module_dir),
            args: manifest.entry.args.clone(),
            module_dir: module_dir.to_path_buf(),
        }
    }

    /// Fetch the module's export tree.
    pub async fn describe(&self) -> Result<Map<String, Value>, ModuleError> {
        match self.exchange(&PluginRequest::Describe).await? {
            Value::Object(exports) => Ok(exports),
            other => Err(ModuleError::InvalidResponse(format!(
                "describe must return an object, got {other}"
            ))),
        }
    }

    async fn exchange(&self, request: &PluginRequest) -> Result<Value, ModuleError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(MODULE_DIR_ENV, &self.module_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = command.spawn().map_err(|source| ModuleError::Spawn {
            command: self.program.display().to_string(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut line = serde_json::to_string(request)
                .map_err(|e| ModuleError::InvalidResponse(e.to_string()))?;
            line.push('\n');
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await?;
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(
            program = %self.program.display(),
            status = %output.status,
            "Module process finished"
        );

        // Describe output is logged, never printed.
        let parsed = parse_output(&stdout)?;
        for line in parsed.passthrough {
            match request {
                PluginRequest::Invoke { .. } => println!("{line}"),
                PluginRequest::Describe => {
                    debug!(program = %self.program.display(), output = %line, "Module output")
                }
            }
        }

        match parsed.response {
            Some(response) => response.into_result(),
            None => Err(ModuleError::NoResponse {
                status: output.status.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ModuleRuntime for ProcessModuleRuntime {
    async fn invoke(&self, invocation: ActionInvocation) -> Result<Value, ModuleError> {
        self.exchange(&PluginRequest::Invoke {
            export: invocation.export_path,
            action: invocation.action,
            options: invocation.options,
        })
        .await
    }
}

/// Loads modules by reading their manifest and asking the process to describe itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessModuleLoader;

#[async_trait]
impl ModuleLoader for ProcessModuleLoader {
    async fn load(
        &self,
        module: &ResolvedModule,
        module_dir: &Path,
    ) -> Result<LoadedModule, ResolutionError> {
        debug!(module = %module.name(), source = %module.module_type(), "Loading module");
        let manifest = ModuleManifest::load(module_dir, module.name())?;
        let runtime = ProcessModuleRuntime::new(&manifest, module_dir);
        let exports = runtime
            .describe()
            .await
            .map_err(|source| ResolutionError::Load {
                module: module.name().to_string(),
                source,
            })?;
        debug!(module = %module.name(), exports = exports.len(), "Loading module - Success");

        Ok(LoadedModule {
            exports,
            runtime: Arc::new(runtime),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::ModuleSpec;
    use serde_json::json;

    const PLUGIN: &str = r#"#!/bin/sh
read -r request
case "$request" in
  *'"op":"describe"'*)
    echo "loading greeter"
    echo '{"ok":true,"result":{"greeter":{"meta":{"name":"greeter"},"exposed":{"hello":{}}}}}'
    ;;
  *'"action":"fail"'*)
    echo '{"ok":false,"error":"greeting failed"}'
    ;;
  *'"action":"silent"'*)
    exit 4
    ;;
  *)
    echo "warming up"
    echo "{\"ok\":true,\"result\":\"hello from $CANTRIPS_MODULE_DIR\"}"
    ;;
esac
"#;

    fn write_plugin(dir: &Path) {
        let script = dir.join("plugin.sh");
        std::fs::write(&script, PLUGIN).unwrap();
        std::fs::write(
            dir.join("cantrips.json"),
            json!({"entry": {"command": "sh", "args": [script]}}).to_string(),
        )
        .unwrap();
    }

    fn invocation(action: &str) -> ActionInvocation {
        ActionInvocation {
            export_path: vec!["greeter".to_string()],
            action: action.to_string(),
            options: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_loader_describes_module() {
        let temp = tempfile::tempdir().unwrap();
        write_plugin(temp.path());
        let module = ResolvedModule::new(&ModuleSpec::new("greeter", "file:."));

        let loaded = ProcessModuleLoader.load(&module, temp.path()).await.unwrap();
        assert!(loaded.exports.contains_key("greeter"));

        let result = loaded.runtime.invoke(invocation("hello")).await.unwrap();
        assert_eq!(
            result,
            json!(format!("hello from {}", temp.path().display()))
        );
    }

    #[tokio::test]
    async fn test_runtime_surfaces_module_errors() {
        let temp = tempfile::tempdir().unwrap();
        write_plugin(temp.path());
        let manifest = ModuleManifest::load(temp.path(), "greeter").unwrap();
        let runtime = ProcessModuleRuntime::new(&manifest, temp.path());

        let err = runtime.invoke(invocation("fail")).await.unwrap_err();
        assert_eq!(err.to_string(), "greeting failed");

        let err = runtime.invoke(invocation("silent")).await.unwrap_err();
        assert!(matches!(err, ModuleError::NoResponse { .. }));
    }

    #[tokio::test]
    async fn test_loader_requires_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let module = ResolvedModule::new(&ModuleSpec::new("empty", "file:."));
        let err = ProcessModuleLoader.load(&module, temp.path()).await.unwrap_err();
        assert!(matches!(err, ResolutionError::MissingManifest { .. }));
    }
}
