use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "remarker")]
#[command(version, about = "Paced, resumable comment runner")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new remarker project
    Init,
    /// Start a run and drive it in the foreground
    Run {
        /// File with one post URL per line
        #[arg(short, long)]
        targets: PathBuf,

        /// File with the comment text (blank lines separate comments with --multi)
        #[arg(short, long)]
        comments: PathBuf,

        /// Treat the comments file as a pool of comments
        #[arg(long)]
        multi: bool,

        /// Vary the comment sent to each post
        #[arg(long)]
        randomize: bool,

        /// Seconds between posts (defaults to run.delay_seconds)
        #[arg(short, long)]
        delay: Option<u64>,
    },
    /// Continue a run left active by a previous process
    Resume,
    /// Ask the running loop to stop after the current post
    Stop,
    /// Show the current run state
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show or clear the outcome history
    History {
        #[arg(long)]
        json: bool,

        /// Clear all recorded outcomes
        #[arg(long)]
        clear: bool,
    },
    /// Reset the run state
    Reset {
        #[arg(long)]
        force: bool,
    },
    /// Serve JSON-lines requests on stdin and write replies to stdout
    Serve,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Run {
            targets,
            comments,
            multi,
            randomize,
            delay,
        } => {
            let args = cmd::RunArgs {
                targets: targets.clone(),
                comments: comments.clone(),
                multi: *multi,
                randomize: *randomize,
                delay: *delay,
            };
            cmd::cmd_run(&cli, &project_dir, args).await?;
        }
        Commands::Resume => cmd::cmd_resume(&cli, &project_dir).await?,
        Commands::Stop => cmd::cmd_stop(&project_dir)?,
        Commands::Status { json } => cmd::cmd_status(&project_dir, *json)?,
        Commands::History { json, clear } => cmd::cmd_history(&project_dir, *json, *clear)?,
        Commands::Reset { force } => cmd::cmd_reset(&project_dir, *force)?,
        Commands::Serve => cmd::cmd_serve(&cli, &project_dir).await?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
