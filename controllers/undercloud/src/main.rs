//! `undercloud` command line
//!
//! One subcommand per Argo workflow step. Logs go to stderr; stdout only
//! carries a step's result (e.g. the enrolled device UUID).

use clap::{Parser, Subcommand};
use nautobot_client::NautobotClient;
use openstack_client::{CloudConfig, Connection, config as clouds};
use redfish_client::Bmc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use undercloud::config::SECRETS_ROOT;
use undercloud::enroll::{self, DEFAULT_LLDP_ATTEMPTS, DEFAULT_LLDP_INTERVAL, EnrollOptions};
use undercloud::events::{EventRouter, route_event};
use undercloud::reconciler::inspection::read_inventory;
use undercloud::reconciler::provision_state::NodeState;
use undercloud::undersync_device::{DeviceNetworkRequest, NetworkName, undersync_device};
use undercloud::{Config, ControllerError, GlobalArgs, Reconciler};
use undersync_client::{SyncMode, Undersync};
use uuid::Uuid;

const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,reqwest=warn,rustls=warn";

#[derive(Debug, Parser)]
#[command(name = "undercloud", version, about = "Bare-metal enrollment and reconciliation")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enroll the server behind a BMC and print its device UUID
    EnrollServer {
        #[arg(long)]
        bmc_ip_address: String,

        /// Current BMC password, tried before the factory defaults
        #[arg(long, env = "OLD_BMC_PASSWORD", hide_env_values = true)]
        old_bmc_password: Option<String>,

        /// Chassis reads while waiting for LLDP
        #[arg(long, default_value_t = DEFAULT_LLDP_ATTEMPTS)]
        lldp_attempts: u32,

        /// Seconds between chassis reads
        #[arg(long, default_value_t = DEFAULT_LLDP_INTERVAL.as_secs())]
        lldp_interval: u64,
    },

    /// Make Ironic ports match the device's Nautobot interfaces
    SyncInterfaces {
        #[arg(long, required_unless_present = "inspection_file")]
        device_id: Option<Uuid>,

        /// Ironic inspection inventory; the device is first reconciled from it
        #[arg(long, conflicts_with = "device_id")]
        inspection_file: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Mirror an Ironic provision state onto the Nautobot device
    SyncProvisionState {
        #[arg(long)]
        device_id: Uuid,

        #[arg(long)]
        provision_state: String,

        #[arg(long)]
        lessee: Option<String>,

        #[arg(long)]
        resource_class: Option<String>,
    },

    /// Handle one Oslo notification
    OpenstackOsloEvent {
        /// Event JSON; read from stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Move a server interface onto a network and push the switch config
    UndersyncDevice {
        #[arg(long)]
        interface_mac: String,

        #[arg(long, value_enum)]
        network_name: NetworkName,

        #[arg(long)]
        network_id: Uuid,

        #[arg(long)]
        device_id: Option<Uuid>,

        #[arg(long)]
        force: bool,

        #[arg(long)]
        dry_run: bool,
    },

    /// Apply the standard BIOS settings
    BiosSettings {
        #[arg(long)]
        bmc_ip_address: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli).await {
        error!("❌ {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), ControllerError> {
    let load = || Config::load(&cli.global, Path::new(SECRETS_ROOT));

    match cli.command {
        Command::EnrollServer {
            bmc_ip_address,
            old_bmc_password,
            lldp_attempts,
            lldp_interval,
        } => {
            let config = load()?;
            let bmc = Bmc::for_ip_address(&bmc_ip_address, config.bmc_master()?)?;
            let reconciler = reconciler(&config).await?;
            let undersync = undersync(&config)?;
            let mut options = EnrollOptions::default().with_old_bmc_password(old_bmc_password);
            if let Some(dir) = &config.device_types_dir {
                options = options.with_device_types(dir);
            }
            options.lldp_attempts = lldp_attempts;
            options.lldp_interval = Duration::from_secs(lldp_interval);

            let device_id = enroll::enroll_server(&bmc, &reconciler, &undersync, &options).await?;
            println!("{device_id}");
        }
        Command::SyncInterfaces {
            device_id,
            inspection_file,
            dry_run,
        } => {
            let config = load()?;
            let reconciler = reconciler(&config).await?;
            let (device_id, summary) = match (device_id, inspection_file) {
                (Some(device_id), _) => (device_id, reconciler.sync_ports(device_id, dry_run).await?),
                (None, Some(path)) => {
                    let (device, summary) = reconciler.sync_inspected(&read_inventory(&path)?, dry_run).await?;
                    println!("{}", device.id);
                    (device.id, summary)
                }
                (None, None) => {
                    return Err(ControllerError::InvalidConfig(
                        "--device-id or --inspection-file is required".to_string(),
                    ));
                }
            };
            if summary.locked {
                info!("Node {device_id} is in use, ports left as they are");
            }
        }
        Command::SyncProvisionState {
            device_id,
            provision_state,
            lessee,
            resource_class,
        } => {
            let state = NodeState::new(provision_state)
                .with_lessee(lessee)
                .with_resource_class(resource_class);
            reconciler(&load()?).await?.sync_provision_state(device_id, &state).await?;
        }
        Command::OpenstackOsloEvent { file } => {
            let load = &load;
            route_event(file.as_deref(), move || async move { event_router(&load()?).await }).await?;
        }
        Command::UndersyncDevice {
            interface_mac,
            network_name,
            network_id,
            device_id,
            force,
            dry_run,
        } => {
            let config = load()?;
            let nautobot = nautobot(&config)?;
            let request = DeviceNetworkRequest {
                interface_mac,
                network_name,
                network_id,
                device_id,
                mode: SyncMode::from_flags(force, dry_run),
            };
            let response = undersync_device(&nautobot, &undersync(&config)?, &request).await?;
            println!("{response}");
        }
        Command::BiosSettings { bmc_ip_address } => {
            let config = load()?;
            let bmc = Bmc::for_ip_address(&bmc_ip_address, config.bmc_master()?)?;
            let changed = enroll::bios_settings(&bmc).await?;
            if changed.is_empty() {
                info!("BIOS settings already converged");
            } else {
                info!("Changed BIOS settings, effective next boot: {changed:?}");
            }
        }
    }
    Ok(())
}

async fn connect(config: &Config) -> Result<Connection, ControllerError> {
    let cloud = CloudConfig::load(&config.os_cloud, &clouds::default_paths())?;
    Ok(Connection::connect(&cloud).await?)
}

fn nautobot(config: &Config) -> Result<NautobotClient, ControllerError> {
    Ok(NautobotClient::new(config.nautobot_url.clone(), config.nautobot_token()?.to_string())?)
}

fn undersync(config: &Config) -> Result<Undersync, ControllerError> {
    Ok(Undersync::new(config.undersync_url.clone(), config.undersync_token()?.to_string())?)
}

fn build_reconciler(config: &Config, nautobot: NautobotClient, connection: &Connection) -> Reconciler {
    Reconciler::new(Box::new(nautobot), Box::new(connection.ironic.clone()))
        .with_registry(config.switch_registry.clone())
        .with_provision_states(config.provision_states.clone())
        .with_interface_type(config.interface_type.clone())
}

async fn reconciler(config: &Config) -> Result<Reconciler, ControllerError> {
    let connection = connect(config).await?;
    Ok(build_reconciler(config, nautobot(config)?, &connection))
}

async fn event_router(config: &Config) -> Result<EventRouter, ControllerError> {
    let connection = connect(config).await?;
    let reconciler = build_reconciler(config, nautobot(config)?, &connection);
    Ok(EventRouter::new(reconciler, Box::new(connection.identity))
        .with_ucvni_group_name(config.ucvni_group_name.clone())
        .with_argo_output_dir(config.argo_output_dir.clone()))
}
