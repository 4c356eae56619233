//! Run a Z-Stack adapter as a network coordinator and log what happens on
//! the network.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::Instant;
use tokio_serial::SerialPortBuilderExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zstack::{spawn_stream_transport, DriverConfig, ZStack, ZStackEvent};
use zstack_protocol::{ClusterId, Endpoint, ProfileId};

const INITIALISE_TIMEOUT: Duration = Duration::from_secs(120);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_POLL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "zstack", version, about = "Z-Stack coordinator runner")]
struct Args {
    /// Serial port of the adapter, e.g. /dev/ttyACM0
    #[arg(short, long)]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,

    /// YAML file with `network` and optional `driver` sections
    #[arg(short, long)]
    config: PathBuf,

    /// Permit joining for this many seconds after start-up
    #[arg(long)]
    permit_join: Option<u8>,

    /// Application endpoint registered on the adapter
    #[arg(long, default_value_t = 1)]
    endpoint: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = DriverConfig::load(&args.config)?;

    info!(port = %args.port, baud = args.baud, "opening adapter");
    let serial = tokio_serial::new(&args.port, args.baud).open_native_async()?;
    let (transport, mut transport_task) = spawn_stream_transport(serial);

    let zstack = ZStack::new(transport, config.driver)?;
    zstack
        .initialise(Instant::now() + INITIALISE_TIMEOUT, config.network)
        .await?;

    zstack
        .register_adapter_endpoint(
            Instant::now() + REQUEST_TIMEOUT,
            Endpoint(args.endpoint),
            ProfileId::HOME_AUTOMATION,
            0x0005,
            0,
            vec![ClusterId(0x0000), ClusterId(0x0006)],
            vec![ClusterId(0x0000), ClusterId(0x0006)],
        )
        .await?;

    if let Some(duration) = args.permit_join {
        zstack
            .permit_join(Instant::now() + REQUEST_TIMEOUT, duration)
            .await?;
    }

    loop {
        tokio::select! {
            result = &mut transport_task => {
                match result? {
                    Ok(()) => warn!("adapter connection closed"),
                    Err(e) => warn!(error = %e, "adapter connection failed"),
                }
                return Ok(());
            }
            event = zstack.read_event(Instant::now() + EVENT_POLL) => match event {
                Ok(event) => log_event(&event),
                Err(e) if e.is_deadline() => {}
                Err(e) => return Err(e.into()),
            },
        }
    }
}

fn log_event(event: &ZStackEvent) {
    match event {
        ZStackEvent::NodeJoin(node) => info!(
            ieee = %node.ieee_address,
            network = %node.network_address,
            logical_type = ?node.logical_type,
            "node joined"
        ),
        ZStackEvent::NodeUpdate(node) => info!(
            ieee = %node.ieee_address,
            network = %node.network_address,
            "node updated"
        ),
        ZStackEvent::NodeLeave(node) => info!(ieee = %node.ieee_address, "node left"),
        ZStackEvent::ApplicationMessage {
            source_ieee,
            source_network,
            message,
        } => info!(
            ieee = %source_ieee,
            network = %source_network,
            cluster = message.cluster_id.0,
            endpoint = message.source_endpoint.0,
            len = message.data.len(),
            "application message"
        ),
    }
}
