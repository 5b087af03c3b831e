mod cli;
mod commands;
mod error;
mod output;
mod setup;

use anyhow::{Result, bail};
use clap::FromArgMatches;
use cli::{DESCRIBE_CI_COMMAND, GlobalArgs, LIST_MODULES_COMMAND, VERSION_COMMAND};
use cantrips_core::CommandTree;
use setup::{Session, init_logging, prepare_session};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let globals = cli::bootstrap_globals();
    let log_guard = init_logging(&globals);
    let debug = globals.debug_enabled();

    if let Err(err) = run(globals).await {
        drop(log_guard);
        error::handle_error(err, debug);
    }
}

async fn run(globals: GlobalArgs) -> Result<()> {
    let Session { config, registry } = prepare_session(&globals).await?;
    let tree = CommandTree::build(&registry);

    let matches = match cli::build_command(&tree).try_get_matches() {
        Ok(matches) => matches,
        Err(err) => err.exit(),
    };
    let format = GlobalArgs::from_arg_matches(&matches)?.format;

    match matches.subcommand() {
        Some((VERSION_COMMAND, _)) => commands::builtin::version(format),
        Some((LIST_MODULES_COMMAND, _)) => commands::builtin::list_modules(&registry, format),
        Some((DESCRIBE_CI_COMMAND, _)) => commands::builtin::describe_ci(format),
        Some((module, module_matches)) => {
            let Some(category) = tree.category(module) else {
                bail!("Invalid command: {module}\n\tSee --help for a list of available commands.");
            };
            let Some((action, action_matches)) = module_matches.subcommand() else {
                bail!("Missing action for {module}");
            };
            commands::module::run(&registry, &config, category, action, action_matches, format)
                .await
        }
        None => {
            cli::build_command(&tree).print_help()?;
            Ok(())
        }
    }
}
