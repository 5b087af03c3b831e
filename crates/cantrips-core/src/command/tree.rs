use serde::Serialize;

use super::dispatch::{DEFAULT_TIMEOUT_MS, TIMEOUT_OPTION};
use crate::models::{Exposed, Parameter};
use crate::registry::{ModuleRegistry, RegisteredModule};

/// Placeholder for missing descriptions.
pub const DEFAULT_DESCRIPTION: &str = "TBD";

/// One `--name` option of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    /// `false` for boolean flags
    pub takes_value: bool,
}

impl OptionSpec {
    fn from_parameter(parameter: &Parameter) -> Self {
        Self {
            name: parameter.name.clone(),
            description: parameter.description.clone().unwrap_or_default(),
            takes_value: !parameter.flag,
        }
    }

    fn timeout() -> Self {
        Self {
            name: TIMEOUT_OPTION.to_string(),
            description: format!("Action timeout in milliseconds (default {DEFAULT_TIMEOUT_MS})"),
            takes_value: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCommand {
    pub name: String,
    pub description: String,
    pub options: Vec<OptionSpec>,
}

/// Commands of one registered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub actions: Vec<ActionCommand>,
}

impl Category {
    pub fn from_module(module: &RegisteredModule) -> Self {
        let actions = match &module.exposed {
            Exposed::Actions(actions) => actions
                .iter()
                .map(|(name, spec)| ActionCommand {
                    name: name.clone(),
                    description: describe(spec.description.as_deref()),
                    options: merge_options(&module.meta.parameters, &spec.parameters),
                })
                .collect(),
            Exposed::Legacy(names) => names
                .iter()
                .map(|name| ActionCommand {
                    name: name.clone(),
                    description: DEFAULT_DESCRIPTION.to_string(),
                    options: Vec::new(),
                })
                .collect(),
        };

        Self {
            name: module.name().to_string(),
            description: describe(module.meta.description.as_deref()),
            actions,
        }
    }

    pub fn action(&self, name: &str) -> Option<&ActionCommand> {
        self.actions.iter().find(|action| action.name == name)
    }
}

/// The synthesized two-level command surface: category, then action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandTree {
    pub categories: Vec<Category>,
}

impl CommandTree {
    pub fn build(registry: &ModuleRegistry) -> Self {
        Self::from_modules(registry.modules())
    }

    pub fn from_modules<'a>(modules: impl IntoIterator<Item = &'a RegisteredModule>) -> Self {
        Self {
            categories: modules.into_iter().map(Category::from_module).collect(),
        }
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }
}

fn describe(description: Option<&str>) -> String {
    description.unwrap_or(DEFAULT_DESCRIPTION).to_string()
}

/// Module parameters, then action parameters, then `timeout` unless declared.
/// A later parameter replaces an earlier one of the same name in place.
fn merge_options(module: &[Parameter], action: &[Parameter]) -> Vec<OptionSpec> {
    let mut options: Vec<OptionSpec> = Vec::new();
    for parameter in module.iter().chain(action) {
        let option = OptionSpec::from_parameter(parameter);
        match options.iter_mut().find(|o| o.name == option.name) {
            Some(existing) => *existing = option,
            None => options.push(option),
        }
    }
    if !options.iter().any(|o| o.name == TIMEOUT_OPTION) {
        options.push(OptionSpec::timeout());
    }
    options
}
