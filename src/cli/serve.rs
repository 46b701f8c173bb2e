use std::future::Future;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use bic_runtime::contract::{ErrorCode, ErrorEnvelope};
use bic_runtime::{BrowserToolHost, ToolResult};

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Pretty-print each response (one response may then span several lines)
    #[arg(long)]
    pub pretty: bool,
}

/// One request line.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

pub async fn handle_line(host: &BrowserToolHost, line: &str) -> ToolResult {
    match serde_json::from_str::<ToolCall>(line) {
        Ok(call) => host.call(&call.tool, call.arguments).await,
        Err(err) => ToolResult::failure(ErrorEnvelope::new(
            ErrorCode::ContractMismatch,
            format!("Malformed tool call: {err}"),
        )),
    }
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let host = ctx.tool_host();
    info!(config = %ctx.config_path().display(), "tool loop ready on stdio");
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    serve_lines(
        &host,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        args.pretty,
        interrupt,
    )
    .await?;
    host.shutdown().await;
    Ok(())
}

/// Answers one result line per request line until EOF or `interrupt`. The interrupt also
/// cancels a tool call that is still running.
pub async fn serve_lines<R, W, I>(
    host: &BrowserToolHost,
    input: R,
    mut output: W,
    pretty: bool,
    interrupt: I,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(interrupt);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = &mut interrupt => {
                info!("interrupted");
                None
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let result = tokio::select! {
            result = handle_line(host, &line) => result,
            _ = &mut interrupt => {
                info!("interrupted during tool call");
                break;
            }
        };
        if let Some(error) = &result.error {
            debug!(code = error.code.as_str(), "tool call failed");
        }
        let mut encoded = if pretty {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        encoded.push('\n');
        if let Err(err) = output.write_all(encoded.as_bytes()).await {
            warn!(error = %err, "stdout closed");
            break;
        }
        output.flush().await.ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    struct NoBrowser;

    #[async_trait::async_trait]
    impl bic_runtime::DriverFactory for NoBrowser {
        async fn open(
            &self,
            _options: bic_runtime::driver::LaunchOptions,
        ) -> bic_runtime::driver::DriverResult<Arc<dyn bic_runtime::driver::BrowserDriver>> {
            Err(
                bic_runtime::driver::DriverError::new(bic_runtime::driver::DriverErrorKind::Launch)
                    .with_hint("no browser in tests"),
            )
        }
    }

    #[tokio::test]
    async fn malformed_lines_are_contract_mismatches() {
        let host = BrowserToolHost::new(Arc::new(NoBrowser));
        let result = handle_line(&host, "{not json").await;
        assert!(!result.ok);
        assert_eq!(result.error.unwrap().code, ErrorCode::ContractMismatch);

        let result = handle_line(&host, &json!({"tool": "browser_observe"}).to_string()).await;
        assert_eq!(result.error.unwrap().code, ErrorCode::ContractMismatch);
    }

    #[tokio::test]
    async fn launch_failure_is_internal_error() {
        let host = BrowserToolHost::new(Arc::new(NoBrowser));
        let line = json!({"tool": "browser_session_open", "arguments": {"url": "https://example.com"}});
        let result = handle_line(&host, &line.to_string()).await;
        assert_eq!(result.error.unwrap().code, ErrorCode::InternalError);
    }

    /// Opens fine, then never sees a download.
    #[derive(Default)]
    struct QuietDriver {
        closed: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl bic_runtime::driver::BrowserDriver for QuietDriver {
        async fn snapshot(
            &self,
            _request: &bic_runtime::driver::SnapshotRequest,
        ) -> bic_runtime::driver::DriverResult<bic_runtime::driver::RawSnapshot> {
            Ok(bic_runtime::driver::RawSnapshot::new(
                bic_runtime::contract::PageIdentity::from_url("https://example.com/"),
            ))
        }

        async fn act(
            &self,
            _request: bic_runtime::driver::ActRequest,
        ) -> bic_runtime::driver::DriverResult<()> {
            Ok(())
        }

        async fn get_downloads(
            &self,
        ) -> bic_runtime::driver::DriverResult<Vec<bic_runtime::driver::DownloadInfo>> {
            Ok(vec![])
        }

        async fn wait_for_download(
            &self,
            timeout: std::time::Duration,
        ) -> bic_runtime::driver::DriverResult<Option<bic_runtime::driver::DownloadInfo>> {
            tokio::time::sleep(timeout).await;
            Ok(None)
        }

        async fn close(&self) -> bic_runtime::driver::DriverResult<()> {
            self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    struct QuietFactory(Arc<QuietDriver>);

    #[async_trait::async_trait]
    impl bic_runtime::DriverFactory for QuietFactory {
        async fn open(
            &self,
            _options: bic_runtime::driver::LaunchOptions,
        ) -> bic_runtime::driver::DriverResult<Arc<dyn bic_runtime::driver::BrowserDriver>> {
            Ok(self.0.clone() as Arc<dyn bic_runtime::driver::BrowserDriver>)
        }
    }

    #[tokio::test]
    async fn interrupt_cancels_long_tool_call() {
        let driver = Arc::new(QuietDriver::default());
        let host = BrowserToolHost::new(Arc::new(QuietFactory(driver.clone())));
        let opened = host
            .call(
                "browser_session_open",
                json!({"url": "https://example.com"}),
            )
            .await;
        let session_id = opened.value.unwrap()["sessionId"].clone();

        let request = json!({
            "tool": "browser_wait_for_download",
            "arguments": {"sessionId": session_id, "timeoutMs": 60000}
        })
        .to_string();
        let mut output = Vec::new();
        let served = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            serve_lines(
                &host,
                request.as_bytes(),
                &mut output,
                false,
                tokio::time::sleep(std::time::Duration::from_millis(100)),
            ),
        )
        .await;
        assert!(served.expect("interrupt ends the loop").is_ok());
        assert!(output.is_empty());

        assert_eq!(host.shutdown().await, 1);
        assert!(driver.closed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn answers_each_line_until_eof() {
        let host = BrowserToolHost::new(Arc::new(NoBrowser));
        let input = "{\"tool\": \"nope\"}\n\n{oops\n";
        let mut output = Vec::new();
        serve_lines(&host, input.as_bytes(), &mut output, false, std::future::pending::<()>())
            .await
            .unwrap();
        let lines: Vec<_> = String::from_utf8(output).unwrap().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(value["ok"], json!(false));
        }
    }
}
