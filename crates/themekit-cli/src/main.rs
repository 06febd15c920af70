#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::unnecessary_wraps)]

mod commands;
mod logging;

use clap::Parser;
use commands::serve::ServeArgs;
use commands::Project;
use miette::Result;
use std::path::PathBuf;
use themekit_core::Config;

#[derive(Parser, Debug)]
#[command(name = "themekit")]
#[command(author, version, about = "Compile, optimise and live-serve theme assets", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Override the project root
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Load this project file instead of <root>/themekit.json
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Compile src/scss entry points to css/
    Styles,

    /// Bundle src/js/*.js into js/scripts.js
    Scripts,

    /// Build the SVG sprite, inline it into header.php and copy standalone SVGs
    Sprite,

    /// Recompress src/images into images/
    Images,

    /// Run the live-reload dev server and watch sources
    Serve(ServeArgs),

    /// Compile styles and scripts, then serve (the default)
    Dev(ServeArgs),

    /// Print version information
    Version,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Styles => "styles",
            Self::Scripts => "scripts",
            Self::Sprite => "sprite",
            Self::Images => "images",
            Self::Serve(_) => "serve",
            Self::Dev(_) => "dev",
            Self::Version => "version",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json_logs)
        .with_config_file(cli.config);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Dev(ServeArgs::default()));

    if matches!(command, Commands::Version) {
        return commands::version::run();
    }

    logging::init(config.verbosity, config.json_logs);

    let span = tracing::info_span!("themekit", cmd = command.name(), cwd = %config.cwd.display());
    let _guard = span.enter();

    let project = Project::load(&config.cwd, config.config_file.as_deref())?;

    let ok = match &command {
        Commands::Styles => commands::styles::run(&project)?,
        Commands::Scripts => commands::scripts::run(&project)?,
        Commands::Sprite => commands::sprite::run(&project),
        Commands::Images => commands::images::run(&project),
        Commands::Serve(args) => commands::serve::run(&project, args)?,
        Commands::Dev(args) => commands::dev::run(&project, args)?,
        Commands::Version => unreachable!(), // Handled above
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
