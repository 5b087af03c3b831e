use anyhow::{Context, Result};
use cantrips_core::command::Category;
use cantrips_core::{CantripsConfig, Dispatcher, ModuleRegistry};
use clap::ArgMatches;
use serde_json::Value;

use crate::cli::action_options;
use crate::output::{OutputFormat, json::print_json};

/// Run `action` of the module behind `category` and print its result.
pub async fn run(
    registry: &ModuleRegistry,
    config: &CantripsConfig,
    category: &Category,
    action: &str,
    matches: &ArgMatches,
    format: OutputFormat,
) -> Result<()> {
    let spec = category
        .action(action)
        .with_context(|| format!("{action} is not an action of {}", category.name))?;
    let options = action_options(spec, matches);

    let result = Dispatcher::new(registry, config)
        .dispatch(&category.name, action, options)
        .await?;

    print_result(&result, format)
}

fn print_result(result: &Value, format: OutputFormat) -> Result<()> {
    if format.is_json() {
        return print_json(result);
    }
    match result {
        Value::Null => Ok(()),
        Value::String(text) => {
            println!("{text}");
            Ok(())
        }
        other => print_json(other),
    }
}
