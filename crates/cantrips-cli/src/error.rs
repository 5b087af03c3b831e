use colored::Colorize;

pub fn handle_error(err: anyhow::Error, debug: bool) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }

    let msg = err.to_string().to_lowercase();

    if msg.contains("timed out after") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Allow the action more time with:");
        eprintln!("  {} cantrips <module> <action> --timeout <ms>", "$".dimmed());
    }

    if msg.contains("is not an action of") || msg.contains("unknown module") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  List available modules and actions with:");
        eprintln!("  {} cantrips listModules", "$".dimmed());
    }

    if msg.contains("git clone") || msg.contains("git fetch") || msg.contains("npm install") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your network connection and repository access, then try again.");
    }

    if msg.contains("configuration") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check the config file, or point at another one with --config <path>.");
    }

    if debug {
        eprintln!("\n{}", "Details:".dimmed());
        eprintln!("{err:?}");
    }

    std::process::exit(1);
}
