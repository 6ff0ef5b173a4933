//! efs-csi: CSI node plugin for Amazon EFS.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use efs_csi::driver::{DEFAULT_ENDPOINT, default_node_id};
use efs_csi::{Config, Driver};

#[derive(Parser, Debug)]
#[command(name = "efs-csi")]
#[command(about = "CSI node plugin for Amazon EFS", version)]
struct Args {
    /// CSI endpoint (unix:// or tcp://).
    #[arg(long, env = "CSI_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Node ID, defaults to the host name.
    #[arg(long)]
    node_id: Option<String>,

    /// Verbosity level (0-4).
    #[arg(short, default_value = "0")]
    v: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Targeted filters keep h2, tonic and hyper quiet.
    let filter = match args.v {
        0 => "warn".to_string(),
        1 => "efs_csi=info,mounter=info,warn".to_string(),
        2 => "efs_csi=debug,mounter=debug,warn".to_string(),
        3 => "efs_csi=trace,mounter=trace,warn".to_string(),
        _ => "efs_csi=trace,mounter=trace,info".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = Config {
        endpoint: args.endpoint,
        node_id: args.node_id.unwrap_or_else(default_node_id),
        ..Default::default()
    };

    Driver::new(config).run().await?;

    Ok(())
}
