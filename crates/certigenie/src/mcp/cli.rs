#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Serve token detection to MCP clients")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Line-delimited JSON-RPC over stdin/stdout
    #[clap(name = "stdio")]
    Stdio,

    /// JSON-RPC over HTTP, with a server-sent events endpoint
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, clap::Args)]
pub struct SseOptions {
    /// TCP port for the HTTP listener
    #[arg(short, long, env = "CERTIGENIE_MCP_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Interface address to bind
    #[arg(long, env = "CERTIGENIE_MCP_HOST", default_value = "127.0.0.1")]
    pub host: String,
}
