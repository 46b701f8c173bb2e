use clap::Subcommand;

use super::observe::ObserveArgs;
use super::serve::ServeArgs;
use super::tools::ToolsArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the stdio tool loop (one JSON call per line)
    Serve(ServeArgs),

    /// Print tool descriptors
    Tools(ToolsArgs),

    /// Open a page, print one observation, close the session
    Observe(ObserveArgs),
}
