use anyhow::Result;
use clap::Args;

use bic_runtime::BrowserToolHost;

#[derive(Args, Clone, Debug)]
pub struct ToolsArgs {
    /// Print only tool names
    #[arg(long)]
    pub names: bool,
}

pub async fn cmd_tools(args: ToolsArgs) -> Result<()> {
    let descriptors = BrowserToolHost::descriptors();
    if args.names {
        for descriptor in descriptors {
            println!("{}", descriptor.name);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
    }
    Ok(())
}
