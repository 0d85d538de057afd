mod config;
mod error;
mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use interfaces::{Interface, RealFs, Repository, SecuritySystem, SnippetSource};
use tracing_subscriber::EnvFilter;
use udev::{Backend, CommandReloader};

use config::Config;
use error::{Error, Result};
use state::State;

const CONFIG_FILE: &str = "sandboxctl.toml";

#[derive(Parser)]
#[command(name = "sandboxctl")]
#[command(about = "Maintain udev confinement rules for snaps", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./sandboxctl.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the udev rules directory
    #[arg(long, global = true)]
    rules_dir: Option<PathBuf>,

    /// Override the state document
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the udev rules of a snap and reload udev if they changed
    Setup {
        /// Snap name
        snap: String,
    },
    /// Delete every udev rule of a snap
    Remove {
        /// Snap name
        snap: String,
    },
    /// Print the snippets a security system receives for a snap
    Snippets {
        /// Snap name
        snap: String,
        /// Security system (apparmor, seccomp, dbus, udev, mount)
        #[arg(short, long, default_value = "udev")]
        system: String,
    },
    /// List the builtin interfaces
    Interfaces,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(rules_dir) = cli.rules_dir {
        config.rules_dir = rules_dir;
    }
    if let Some(state) = cli.state {
        config.state = Some(state);
    }
    init_tracing(&config.log.filter, cli.verbose);

    match cli.command {
        Commands::Setup { snap } => cmd_setup(&config, &snap),
        Commands::Remove { snap } => cmd_remove(&config, &snap),
        Commands::Snippets { snap, system } => cmd_snippets(&config, &snap, &system),
        Commands::Interfaces => cmd_interfaces(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

fn init_tracing(filter: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn backend(config: &Config) -> Backend<CommandReloader> {
    Backend::new(
        &config.rules_dir,
        CommandReloader::new(config.reload.commands.clone()),
    )
}

fn load_repository(config: &Config) -> Result<Repository> {
    let path = config.state.as_deref().ok_or(Error::NoState)?;
    State::load(path)?.into_repository(config, Arc::new(RealFs))
}

fn cmd_setup(config: &Config, name: &str) -> Result<()> {
    let repo = load_repository(config)?;
    let snap = repo
        .snap(name)
        .ok_or_else(|| Error::SnapNotFound(name.to_string()))?;

    let changes = backend(config).setup_snap(snap, &repo)?;
    if changes.changed.is_empty() && changes.removed.is_empty() {
        println!("udev rules of {name} are up to date");
    }
    for file in &changes.changed {
        println!("wrote {}", config.rules_dir.join(file).display());
    }
    for file in &changes.removed {
        println!("removed {}", config.rules_dir.join(file).display());
    }
    Ok(())
}

fn cmd_remove(config: &Config, name: &str) -> Result<()> {
    let changes = backend(config).remove_snap(name)?;
    if changes.removed.is_empty() {
        println!("no udev rules for {name}");
    }
    for file in &changes.removed {
        println!("removed {}", config.rules_dir.join(file).display());
    }
    Ok(())
}

fn cmd_snippets(config: &Config, name: &str, system: &str) -> Result<()> {
    let system: SecuritySystem = system.parse()?;
    let repo = load_repository(config)?;
    if repo.snap(name).is_none() {
        return Err(Error::SnapNotFound(name.to_string()));
    }

    let snippets = repo.security_snippets_for_snap(name, system)?;
    if snippets.is_empty() {
        println!("No {system} snippets for {name}.");
        return Ok(());
    }
    for (tag, list) in &snippets {
        println!("# {tag}");
        for snippet in list {
            print!("{}", String::from_utf8_lossy(snippet));
            if !snippet.ends_with(b"\n") {
                println!();
            }
        }
    }
    Ok(())
}

fn cmd_interfaces(config: &Config) -> Result<()> {
    let repo = Repository::with_builtins(&config.builtin_config(), Arc::new(RealFs))?;

    println!("{:<20}  AUTO-CONNECT", "INTERFACE");
    println!("{}", "-".repeat(34));
    for iface in repo.interfaces() {
        let auto = if iface.auto_connect() { "yes" } else { "no" };
        println!("{:<20}  {auto}", iface.name());
    }
    Ok(())
}
