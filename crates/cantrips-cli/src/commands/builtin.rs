use anyhow::Result;
use cantrips_core::ModuleRegistry;
use cantrips_core::ci::CiEnvironment;
use cantrips_core::command::DEFAULT_DESCRIPTION;
use comfy_table::Cell;
use serde::Serialize;

use crate::output::table::{new_table, print_table};
use crate::output::{OutputFormat, json::print_json};

#[derive(Serialize)]
struct ModuleSummary<'a> {
    name: &'a str,
    description: &'a str,
    export: Vec<&'a str>,
    actions: Vec<&'a str>,
}

pub fn version(format: OutputFormat) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if format.is_json() {
        return print_json(&serde_json::json!({ "version": version }));
    }
    println!("{version}");
    Ok(())
}

pub fn list_modules(registry: &ModuleRegistry, format: OutputFormat) -> Result<()> {
    let modules: Vec<ModuleSummary<'_>> = registry
        .modules()
        .map(|module| ModuleSummary {
            name: module.name(),
            description: module
                .meta
                .description
                .as_deref()
                .unwrap_or(DEFAULT_DESCRIPTION),
            export: module.export_path.iter().map(String::as_str).collect(),
            actions: module.exposed.action_names(),
        })
        .collect();

    if format.is_json() {
        return print_json(&modules);
    }

    if modules.is_empty() {
        println!("No modules registered.");
        return Ok(());
    }

    let mut table = new_table(vec!["Module", "Description", "Actions"]);
    for module in modules {
        table.add_row(vec![
            Cell::new(module.name),
            Cell::new(module.description),
            Cell::new(module.actions.join(", ")),
        ]);
    }
    print_table(table)
}

pub fn describe_ci(format: OutputFormat) -> Result<()> {
    let ci = CiEnvironment::detect();
    if format.is_json() {
        return print_json(&ci);
    }

    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let mut table = new_table(vec!["Property", "Value"]);
    table.add_row(vec!["CI", if ci.is_ci { "yes" } else { "no" }]);
    table.add_row(vec![
        "Provider".to_string(),
        ci.provider
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Branch".to_string(), or_dash(&ci.branch)]);
    table.add_row(vec!["Commit".to_string(), or_dash(&ci.commit)]);
    table.add_row(vec!["Build".to_string(), or_dash(&ci.build)]);
    table.add_row(vec!["Pull request".to_string(), or_dash(&ci.pull_request)]);
    print_table(table)
}
