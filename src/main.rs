use crate::areas::repository::Repository;
use crate::error::ValidationError;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write as _;

mod areas;
mod artifacts;
mod commands;
mod error;

#[derive(Parser)]
#[command(
    name = "knot",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A single-user, local version-control system",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a new repository")]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
    #[command(about = "Stage files for the next save")]
    Add {
        #[arg(index = 1, required = true, help = "The paths to stage")]
        paths: Vec<String>,
    },
    #[command(name = "rm", about = "Unstage or remove files")]
    Remove {
        #[arg(index = 1, required = true, help = "The paths to remove")]
        paths: Vec<String>,
    },
    #[command(about = "Show the working tree and index status")]
    Status,
    #[command(about = "Create a new checkpoint from the staged index")]
    Save {
        #[arg(short, long, help = "The save message")]
        message: String,
    },
    #[command(about = "Load a ref or checkpoint id into the working directory")]
    Load {
        #[arg(index = 1, help = "The ref name or checkpoint id to load")]
        target: String,
    },
    #[command(about = "Restore paths from the current save, discarding local edits")]
    Restore {
        #[arg(index = 1, required = true, help = "The paths to restore")]
        paths: Vec<String>,
    },
    #[command(name = "ref", about = "Create a new ref at the current checkpoint")]
    CreateRef {
        #[arg(index = 1, help = "The name of the new ref")]
        name: String,
    },
    #[command(about = "List all refs")]
    Refs,
    #[command(about = "Merge another ref into the current one")]
    Merge {
        #[arg(index = 1, help = "The ref to merge in")]
        ref_name: String,
    },
    #[command(about = "Show the history of the current save")]
    Log,
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        if let Some(validation) = err.downcast_ref::<ValidationError>() {
            eprintln!("{}", validation.message());
        } else {
            eprintln!("error: {err:#}");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let pwd = std::env::current_dir()?;

    match &cli.command {
        Commands::Init { path } => {
            let target = path.clone().unwrap_or_else(|| pwd.to_string_lossy().into_owned());
            let repository = Repository::init(target, Box::new(std::io::stdout()))?;
            writeln!(repository.writer(), "initialized repository at {}", repository.root().display())?;
            Ok(())
        }
        Commands::Add { paths } => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::add::add(&repository, paths)
        }
        Commands::Remove { paths } => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::remove::remove(&repository, paths)
        }
        Commands::Status => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::status::status(&repository)
        }
        Commands::Save { message } => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::save::save(&repository, message)
        }
        Commands::Load { target } => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::load::load(&repository, target)
        }
        Commands::Restore { paths } => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::restore::restore(&repository, paths)
        }
        Commands::CreateRef { name } => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::create_ref::create_ref(&repository, name)
        }
        Commands::Refs => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::list_refs::list_refs(&repository)
        }
        Commands::Merge { ref_name } => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::merge::merge(&repository, ref_name)
        }
        Commands::Log => {
            let repository = Repository::open(pwd, Box::new(std::io::stdout()))?;
            commands::log::log(&repository)
        }
    }
}
