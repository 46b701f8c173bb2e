use anyhow::Result;

use super::env::CliArgs;
use super::observe::cmd_observe;
use super::serve::cmd_serve;
use super::tools::cmd_tools;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Serve(args) => cmd_serve(args, ctx).await,
        Commands::Tools(args) => cmd_tools(args).await,
        Commands::Observe(args) => cmd_observe(args, ctx).await,
    }
}
