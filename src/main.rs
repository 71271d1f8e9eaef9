use anyhow::Result;
use worktally::cli::run_cli;

fn main() -> Result<()> {
    run_cli()
}
