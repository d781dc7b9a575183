use crate::prelude::{eprintln, *};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// One JSON-RPC request per line on stdin, one response per line on stdout.
pub async fn run_stdio(global: crate::Global) -> Result<()> {
    if global.verbose {
        eprintln!("Starting certigenie MCP server on stdio...");
        eprintln!();
    }

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let request = line.trim();
        if !request.is_empty() {
            log::debug!("<- {request}");

            let response = serde_json::to_string(&super::handle_request(request, &global).await)?;
            log::debug!("-> {response}");

            stdout.write_all(response.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        line.clear();
    }

    log::info!("stdin closed, stopping MCP server");
    Ok(())
}
