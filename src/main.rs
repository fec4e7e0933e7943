//! Paddle CLI entry point
//!
//! Parses the command line, runs the command and renders errors with their
//! suggestions. Any failure exits with status 1.

use anyhow::Result;
use clap::Parser;
use paddle_cli::cli;
use paddle_cli::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
