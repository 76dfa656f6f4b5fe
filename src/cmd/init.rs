//! Project setup: `remarker init`.

use anyhow::Result;
use std::path::Path;

pub fn cmd_init(project_dir: &Path) -> Result<()> {
    use remarker::init::{init_project, is_initialized};

    let was_initialized = is_initialized(project_dir);
    let result = init_project(project_dir)?;

    if result.created {
        println!(
            "Initialized remarker project at {}",
            result.state_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .remarker/");
        println!("  ├── remarker.toml  # Delays, pacing, and worker commands");
        println!("  └── logs/          # Daily log files");
        println!();
        println!("Next steps:");
        println!("  1. Set worker.submit_command in .remarker/remarker.toml");
        println!("  2. Run `remarker run --targets posts.txt --comments comment.txt`");
    } else if was_initialized && !result.wrote_config {
        println!(
            "Remarker project already initialized at {}",
            result.state_dir.display()
        );
        println!("Directory structure verified.");
    } else {
        println!(
            "Completed remarker initialization at {}",
            result.state_dir.display()
        );
    }

    Ok(())
}
