//! Blueprint CLI - inspect and edit persisted artifact stores

mod cli;
mod colorizer;
mod table;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();

    // Logging comes up before the stores open so snapshot recovery is reported
    cli::init_cli_logging(&cli_args);

    let result = cli::BlueprintApp::from_cli(&cli_args)
        .and_then(|mut app| app.run(cli_args.command));

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
