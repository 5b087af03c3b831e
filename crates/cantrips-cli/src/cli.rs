//! Command-line surface.
//!
//! Parsing happens in two passes. The first pass only picks up the global
//! flags needed to locate the root and config. The full command is then built
//! at runtime from the registered modules and parses the real arguments.

use cantrips_core::command::{ActionCommand, Category, CommandTree, OptionSpec};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Args, Command, Parser};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;

use crate::output::OutputFormat;

pub const VERSION_COMMAND: &str = "version";
pub const LIST_MODULES_COMMAND: &str = "listModules";
pub const DESCRIBE_CI_COMMAND: &str = "describeCI";

/// Names a module category may not take.
const RESERVED_COMMANDS: [&str; 4] = [VERSION_COMMAND, LIST_MODULES_COMMAND, DESCRIBE_CI_COMMAND, "help"];

/// Names a module option may not take.
const RESERVED_OPTIONS: [&str; 7] = ["root", "config", "verbose", "debug", "format", "help", "version"];

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Cantrips root directory (defaults to ~/.cantrips)
    #[arg(long, global = true, env = "CANTRIPS_DIR")]
    pub root: Option<PathBuf>,

    /// Config file (defaults to .cantrips.toml, .cantrips.json, cantrips.toml or cantrips.json)
    #[arg(long, global = true, env = "CANTRIPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print full error details
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

impl GlobalArgs {
    pub fn debug_enabled(&self) -> bool {
        self.debug || std::env::var_os("CANTRIPS_DEBUG").is_some_and(|v| !v.is_empty())
    }
}

/// First pass: global flags only, everything else left for the full command.
#[derive(Parser, Debug)]
#[command(
    name = "cantrips",
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
struct Bootstrap {
    #[command(flatten)]
    globals: GlobalArgs,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

/// Global flags from the process arguments.
///
/// Malformed arguments fall back to defaults; the full parse reports them.
pub fn bootstrap_globals() -> GlobalArgs {
    Bootstrap::try_parse()
        .map(|bootstrap| bootstrap.globals)
        .unwrap_or_default()
}

/// Build the full command: built-ins plus one category per registered module.
pub fn build_command(tree: &CommandTree) -> Command {
    let command = Command::new("cantrips")
        .about("Cantrips - a command runner assembled from pluggable modules")
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(Command::new(VERSION_COMMAND).about("Print the cantrips version"))
        .subcommand(Command::new(LIST_MODULES_COMMAND).about("List registered modules"))
        .subcommand(
            Command::new(DESCRIBE_CI_COMMAND).about("Describe the detected CI environment"),
        );
    let mut command = GlobalArgs::augment_args(command);

    for category in &tree.categories {
        if RESERVED_COMMANDS.contains(&category.name.as_str()) {
            warn!(module = %category.name, "Module name collides with a built-in command, skipping");
            continue;
        }
        command = command.subcommand(category_command(category));
    }

    command
}

fn category_command(category: &Category) -> Command {
    // `help` is a valid action name; `--help` still prints usage.
    let mut command = Command::new(category.name.clone())
        .about(category.description.clone())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .disable_help_subcommand(true);

    let mut seen = HashSet::new();
    for action in &category.actions {
        if !seen.insert(action.name.as_str()) {
            warn!(module = %category.name, action = %action.name, "Duplicate action, skipping");
            continue;
        }
        command = command.subcommand(action_command(&category.name, action));
    }

    command
}

fn action_command(module: &str, action: &ActionCommand) -> Command {
    let mut command = Command::new(action.name.clone()).about(action.description.clone());
    for option in &action.options {
        if RESERVED_OPTIONS.contains(&option.name.as_str()) {
            warn!(
                module = %module,
                action = %action.name,
                option = %option.name,
                "Option collides with a global flag, skipping"
            );
            continue;
        }
        command = command.arg(option_arg(option));
    }
    command
}

fn option_arg(option: &OptionSpec) -> Arg {
    let arg = Arg::new(option.name.clone())
        .long(option.name.clone())
        .help(option.description.clone());

    if option.takes_value {
        arg.value_name(option.name.to_uppercase()).num_args(0..=1)
    } else {
        arg.action(ArgAction::SetTrue)
    }
}

/// Raw options of a parsed action, keyed by option name.
///
/// A value option given without a value becomes `true`, like a flag.
pub fn action_options(action: &ActionCommand, matches: &ArgMatches) -> Map<String, Value> {
    let mut options = Map::new();

    for option in &action.options {
        let id = option.name.as_str();
        if RESERVED_OPTIONS.contains(&id) {
            continue;
        }
        let value = if option.takes_value {
            match matches.try_get_one::<String>(id) {
                Ok(Some(value)) => Value::String(value.clone()),
                Ok(None) if matches.value_source(id) == Some(ValueSource::CommandLine) => {
                    Value::Bool(true)
                }
                _ => continue,
            }
        } else {
            match matches.try_get_one::<bool>(id) {
                Ok(Some(true)) => Value::Bool(true),
                _ => continue,
            }
        };
        options.insert(option.name.clone(), value);
    }

    options
}
