use anyhow::{anyhow, Result};
use clap::Args;

use bic_runtime::contract::ObserveScope;
use bic_runtime::tools::{ObserveArgs as ObserveToolArgs, SessionOpenArgs};
use tracing::warn;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ObserveArgs {
    /// URL to open
    #[arg(long)]
    pub url: String,

    /// Maximum affordances in the printed page (1-200)
    #[arg(long)]
    pub max: Option<usize>,

    /// Observation scope
    #[arg(long, value_parser = parse_scope)]
    pub scope: Option<ObserveScope>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

fn parse_scope(raw: &str) -> Result<ObserveScope, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_ascii_lowercase()))
        .map_err(|_| format!("unknown scope '{raw}' (expected viewport, document or modal)"))
}

pub async fn cmd_observe(args: ObserveArgs, ctx: &CliContext) -> Result<()> {
    let host = ctx.tool_host();
    let session_id = host
        .open_session(SessionOpenArgs {
            url: args.url.clone(),
            headless: !args.headful,
            slow_mo_ms: None,
            executable_path: None,
            storage_state_path: None,
            download_dir: ctx.config().driver.download_dir.clone(),
        })
        .await
        .map_err(|err| anyhow!(err.to_string()))?;

    let observed = host
        .observe(ObserveToolArgs {
            session_id: session_id.to_string(),
            mode: Default::default(),
            scope: args.scope,
            max_affordances: args.max,
            include_hidden: None,
            include_disabled: None,
            cursor: None,
        })
        .await;

    if let Err(err) = host.close_session(&session_id).await {
        warn!(session = %session_id, error = %err, "failed to close session");
    }

    let observation = observed.map_err(|err| anyhow!(err.to_string()))?;
    println!("{}", serde_json::to_string_pretty(&observation)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parser_accepts_known_values() {
        assert_eq!(parse_scope("Modal").unwrap(), ObserveScope::Modal);
        assert!(parse_scope("page").is_err());
    }
}
