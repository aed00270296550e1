//#![deny(clippy::unwrap_used)]
//#![deny(clippy::expect_used)]

mod lifecycle;
mod netlink;
mod node;
mod service;
mod session;
mod status;
#[cfg(test)]
mod testing;
mod traits;
mod ui;
mod utils;
mod wg_quick;
mod wireguard;

use std::{net::IpAddr, path::PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Args, Parser, Subcommand};
use node::NodeClient;
use service::{keys::PrivateKey, Service};
use thiserror::Error;
use tracing::{info, warn};
use ui::web::{response::Connect, ControlClient};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid resolver ip {0}")]
    InvalidResolver(String),
    #[error("can't determine home directory, pass --home")]
    NoHome,
}

#[derive(Debug, Parser)]
#[clap(name = "dvpn-client", about = "Session tunnel daemon and control client")]
struct Config {
    /// Directory holding the status record and interface configs
    #[clap(long, env = "DVPN_HOME", value_parser)]
    home: Option<PathBuf>,

    #[clap(flatten)]
    api: ui::web::Config,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the daemon serving the control API
    Start {
        #[clap(flatten)]
        service: service::Config,
    },
    /// Register a session with a node and bring the tunnel up
    Connect(ConnectArgs),
    /// Tear the active tunnel down
    Disconnect,
    /// Show the active tunnel and its traffic
    Status,
}

#[derive(Debug, Args)]
struct ConnectArgs {
    /// Remote URL of the node
    #[clap(long, value_parser)]
    node: String,
    /// Account address the session belongs to
    #[clap(long, value_parser)]
    account: String,
    #[clap(long, value_parser)]
    session: u64,
    /// Base64 signature over the big-endian session id
    #[clap(long, value_parser)]
    signature: String,
    /// Additional DNS servers
    #[clap(long = "resolver", value_parser)]
    resolvers: Vec<String>,
}

fn parse_resolvers(items: &[String]) -> Result<Vec<IpAddr>, CliError> {
    items
        .iter()
        .map(|s| s.parse().map_err(|_| CliError::InvalidResolver(s.clone())))
        .collect()
}

fn resolve_home(home: Option<PathBuf>) -> Result<PathBuf, CliError> {
    home.or_else(|| dirs::home_dir().map(|h| h.join(".dvpn-client")))
        .ok_or(CliError::NoHome)
}

async fn connect(client: &ControlClient, args: ConnectArgs) -> Result<(), BoxError> {
    let resolvers = parse_resolvers(&args.resolvers)?;
    let signature = STANDARD.decode(args.signature.trim())?;

    let key = PrivateKey::generate();
    let info = NodeClient::new(&args.node)
        .add_session(&args.account, args.session, &key.public(), &signature)
        .await?;

    if let Some(active) = client.status().await? {
        info!(iface = %active.iface, id = active.id, "disconnecting active tunnel");
        client.disconnect().await?;
    }

    client
        .connect(&Connect {
            id: args.session,
            info: STANDARD.encode(info),
            keys: vec![key.to_base64()],
            resolvers,
        })
        .await?;

    println!("connected, session {}", args.session);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    pretty_env_logger::init();

    let config = Config::parse();
    let client = ControlClient::new(config.api.listen_addr);

    match config.command {
        Command::Start { service } => {
            let home = resolve_home(config.home)?;
            let service = Service::new(service, &home)?;
            info!(home = %home.display(), iface = service.interface(), "starting daemon");

            for f in ui::run(&config.api, service) {
                f.await??;

                warn!("frontend stopped")
            }
        }
        Command::Connect(args) => connect(&client, args).await?,
        Command::Disconnect => {
            client.disconnect().await?;
            println!("disconnected");
        }
        Command::Status => match client.status().await? {
            Some(s) => println!(
                "session {}\ninterface {}\nupload {} bytes\ndownload {} bytes",
                s.id, s.iface, s.upload, s.download
            ),
            None => println!("no active tunnel"),
        },
    }

    Ok(())
}
