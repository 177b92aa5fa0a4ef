//! Tableflow CLI
//!
//! Inspect operations and tables through a validator gateway, or run the
//! full create/write/confirm lifecycle against an in-memory network.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tableflow_client::{ClientConfig, GatewayClient};
use tableflow_core::{ReadAccessor, Verifier};
use tableflow_lifecycle::{
    CancellationToken, ConfirmationPoller, LifecycleConfig, LifecycleCoordinator,
    OperationSubmitter, PollOutcome, Resolution, Session, TableProvisioner,
};
use tableflow_simulation::{SimulatedNetwork, SimulatedSigner, StatusScript};
use tableflow_types::{demo, ContextId, OperationHandle, ResourceId, Row};
use tracing_subscriber::EnvFilter;

/// Chain id used by the in-memory demo network.
const DEMO_CONTEXT: ContextId = ContextId(31337);
const DEMO_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

#[derive(Parser)]
#[command(name = "tableflow")]
#[command(about = "Submit, track and inspect table operations")]
#[command(version)]
struct Cli {
    /// Client configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Gateway base URL, overriding the configuration file
    #[arg(long, global = true)]
    gateway: Option<String>,

    /// Poll interval (e.g. "1500ms"), overriding the configuration file
    #[arg(long, global = true)]
    poll_interval: Option<humantime::Duration>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a table and write to it on an in-memory network
    Demo {
        /// Table name prefix
        #[arg(long, default_value = "demo")]
        prefix: String,

        /// Back-to-back writes; all but the last are superseded
        #[arg(long, default_value = "3")]
        writes: usize,

        /// "Not yet seen" answers before each operation confirms
        #[arg(long, default_value = "2")]
        unseen: u32,
    },

    /// Look up an operation's status once
    Status {
        /// Chain id
        #[arg(long)]
        context: u64,

        /// Transaction hash
        #[arg(long)]
        handle: String,
    },

    /// Poll an operation until it is confirmed or rejected
    Wait {
        /// Chain id
        #[arg(long)]
        context: u64,

        /// Transaction hash
        #[arg(long)]
        handle: String,

        /// Give up after this long (e.g. "2m")
        #[arg(long)]
        timeout: Option<humantime::Duration>,
    },

    /// Print a table's schema as the network stores it
    Schema {
        /// Chain id
        #[arg(long)]
        context: u64,

        /// Table id
        #[arg(long)]
        table: u64,
    },

    /// Print a demo table's rows
    Query {
        /// Chain id
        #[arg(long)]
        context: u64,

        /// Full table name, e.g. "demo_31337_2"
        #[arg(long)]
        table: String,

        /// Maximum number of rows
        #[arg(long)]
        limit: Option<u32>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.gateway {
        config = config.with_gateway_url(url.clone());
    }
    if let Some(interval) = cli.poll_interval {
        config = config.with_poll_interval(*interval);
    }
    config.lifecycle_config().validate()?;
    Ok(config)
}

fn print_rows(rows: &[Row]) {
    for row in rows {
        println!(
            "  {:>4}  {:<20} block {:<8} tx {}",
            row.id, row.name, row.block, row.tx
        );
    }
}

async fn run_demo(
    config: LifecycleConfig,
    prefix: &str,
    writes: usize,
    unseen: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let network = SimulatedNetwork::new(DEMO_CONTEXT);
    network.set_default_script(StatusScript::confirm_after(unseen));
    let shared = Arc::new(network.clone());

    let signer = Arc::new(SimulatedSigner::new(DEMO_ADDRESS, DEMO_CONTEXT));
    let session = Session::connect(signer).await?;

    let provisioner = TableProvisioner::new(
        OperationSubmitter::new(shared.clone()),
        ConfirmationPoller::new(shared.clone()),
        shared.clone(),
        config.clone(),
    )?;

    println!("Creating table with prefix {prefix:?}...");
    let resource = provisioner.create_table(&session, prefix).await?;
    println!(
        "Created {} ({})",
        resource.name,
        resource.column_names().join(", ")
    );

    let mut coordinator = LifecycleCoordinator::new(
        resource,
        OperationSubmitter::new(shared.clone()),
        ConfirmationPoller::new(shared.clone()),
        shared,
        config,
    )?;

    for i in 1..=writes {
        let handle = coordinator
            .insert_name(&session, &format!("row {i}"))
            .await?;
        println!("Submitted {handle}");
    }

    match coordinator.next_resolution().await? {
        Some(Resolution::Confirmed { handle, rows }) => {
            println!("Confirmed {handle}; table now holds:");
            print_rows(&rows);
        }
        Some(Resolution::Failed { handle, reason }) => {
            println!("{handle} failed: {reason:?}");
        }
        None => println!("Nothing was written."),
    }

    println!(
        "{} submissions, {} refresh queries",
        network.submissions(),
        network.read_queries()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Demo {
            prefix,
            writes,
            unseen,
        } => {
            run_demo(config.lifecycle_config(), &prefix, writes, unseen).await?;
        }

        Commands::Status { context, handle } => {
            let gateway = GatewayClient::from_config(&config)?;
            let handle = OperationHandle::from_hex(&handle)?;
            let status = gateway.status(ContextId(context), &handle).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::Wait {
            context,
            handle,
            timeout,
        } => {
            let gateway = GatewayClient::from_config(&config)?;
            let handle = OperationHandle::from_hex(&handle)?;
            let poller = ConfirmationPoller::new(Arc::new(gateway));

            let poll = poller.poll(
                handle.clone(),
                ContextId(context),
                config.lifecycle_config().poll_policy(),
                CancellationToken::new(),
            );
            let outcome = match timeout {
                Some(timeout) => tokio::time::timeout(*timeout, poll).await?,
                None => poll.await,
            };

            match outcome {
                PollOutcome::Confirmed(status) => {
                    println!("{handle} confirmed in block {:?}", status.block_number);
                }
                PollOutcome::Rejected(status) => {
                    println!(
                        "{handle} rejected: {}",
                        status.error.as_deref().unwrap_or("no reason given")
                    );
                }
                PollOutcome::Abandoned {
                    attempts,
                    last_error,
                } => {
                    println!("Gave up on {handle} after {attempts} attempts: {last_error}");
                }
            }
        }

        Commands::Schema { context, table } => {
            let gateway = GatewayClient::from_config(&config)?;
            let columns = gateway
                .resource_schema(ContextId(context), ResourceId(table))
                .await?;
            for column in columns {
                println!(
                    "  {:<20} {:<10} {}",
                    column.name,
                    column.column_type,
                    column.constraints.as_deref().unwrap_or("")
                );
            }
        }

        Commands::Query {
            context,
            table,
            limit,
        } => {
            let gateway = GatewayClient::from_config(&config)?;
            let select = demo::select_all(&table, limit);
            let rows = gateway.query(ContextId(context), &table, &select).await?;
            println!("{} rows", rows.len());
            print_rows(&rows);
        }
    }

    Ok(())
}
