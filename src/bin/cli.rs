//! dby-cli
//!
//! Command-line front for the bridge: one subcommand per daemon operation,
//! run against a Redis store.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use dby_bridge::protocol::QueryParams;
use dby_bridge::{
    AllocationMode, Bridge, BridgeConfig, BridgeError, CancelToken, Operation, OperationKind,
    Outcome, RedisStore, Slot,
};
use tracing_subscriber::{fmt, EnvFilter};

/// dby-cli
#[derive(Parser, Debug)]
#[command(name = "dby-cli")]
#[command(about = "Send commands to the databayes daemon through its shared store")]
#[command(version)]
struct Args {
    /// Store address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    store: String,

    /// Store database index
    #[arg(long, default_value = "0")]
    db: u32,

    /// Milliseconds between response polls
    #[arg(long, default_value = "10")]
    poll_interval_ms: u64,

    /// Maximum response polls
    #[arg(long, default_value = "5")]
    max_attempts: u32,

    /// Number of correlation slots in the ring
    #[arg(long, default_value = "10")]
    max_slots: u32,

    /// Abort after this many milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Route slot allocation through a single owner thread
    #[arg(long)]
    serialized: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Define an entity: def E(f1_t1,...)
    Def {
        entity: String,

        /// Comma-separated field names
        #[arg(long, default_value = "")]
        fields: String,

        /// Comma-separated field types
        #[arg(long, default_value = "")]
        types: String,
    },

    /// Add a relation: add rel E1(f=v,...) E2(f=v,...)
    AddRel(RelationArgs),

    /// Remove an entity: rm ent E
    RmEnt { entity: String },

    /// Remove a relation: rm rel E1(...) E2(...)
    RmRel(RelationArgs),

    /// List entities: lst ent PATTERN
    LstEnt { pattern: String },

    /// List relations: lst rel E1(...) E2(...)
    LstRel(RelationArgs),

    /// Generate (reserved)
    Gen,

    /// Poll a slot left pending by an earlier request
    Poll { slot: u32 },

    /// Check the store answers
    Ping,
}

#[derive(ClapArgs, Debug)]
struct RelationArgs {
    entity1: String,
    entity2: String,

    #[arg(long, default_value = "")]
    fields1: String,

    #[arg(long, default_value = "")]
    values1: String,

    #[arg(long, default_value = "")]
    fields2: String,

    #[arg(long, default_value = "")]
    values2: String,
}

impl RelationArgs {
    fn params(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("fields1", self.fields1.as_str()),
            ("values1", self.values1.as_str()),
            ("fields2", self.fields2.as_str()),
            ("values2", self.values2.as_str()),
        ]
    }
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,dby_bridge=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = BridgeConfig::builder()
        .store_addr(&args.store)
        .store_db(args.db)
        .poll_interval_ms(args.poll_interval_ms)
        .max_attempts(args.max_attempts)
        .max_slots(args.max_slots)
        .allocation(if args.serialized {
            AllocationMode::Serialized
        } else {
            AllocationMode::Direct
        })
        .build();

    tracing::debug!("dby-cli v{} against {}", dby_bridge::VERSION, config.store_addr);

    match run(&args, &config) {
        Ok(outcome) => report(&outcome),
        Err(e) => {
            tracing::error!("{}", e);
            println!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &BridgeConfig) -> dby_bridge::Result<Outcome> {
    let store = Arc::new(RedisStore::new(config)?);

    if let Commands::Ping = args.command {
        store.ping()?;
        return Ok(Outcome::Accepted("PONG".to_string()));
    }

    let bridge = Bridge::new(store, config)?;

    let mut cancel = CancelToken::never();
    if let Some(ms) = args.timeout_ms {
        cancel = cancel.with_timeout(Duration::from_millis(ms));
    }

    if let Commands::Poll { slot } = args.command {
        if slot >= config.max_slots {
            return Err(BridgeError::Validation(format!(
                "slot {} outside ring of {}",
                slot, config.max_slots
            )));
        }
        return Ok(bridge.poll(Slot::new(slot), bridge.policy(), &cancel));
    }

    let operation = operation_from(&args.command)?;
    Ok(bridge.invoke(&operation, &cancel))
}

/// Build the operation the same way a routed request would
fn operation_from(command: &Commands) -> dby_bridge::Result<Operation> {
    let (kind, positional, pairs): (OperationKind, Vec<&str>, Vec<(&str, &str)>) = match command {
        Commands::Def {
            entity,
            fields,
            types,
        } => (
            OperationKind::DefineEntity,
            vec![entity.as_str()],
            vec![("fields", fields.as_str()), ("types", types.as_str())],
        ),
        Commands::AddRel(rel) => (
            OperationKind::AddRelation,
            vec![rel.entity1.as_str(), rel.entity2.as_str()],
            rel.params(),
        ),
        Commands::RmEnt { entity } => (OperationKind::RemoveEntity, vec![entity.as_str()], vec![]),
        Commands::RmRel(rel) => (
            OperationKind::RemoveRelation,
            vec![rel.entity1.as_str(), rel.entity2.as_str()],
            rel.params(),
        ),
        Commands::LstEnt { pattern } => (OperationKind::ListEntity, vec![pattern.as_str()], vec![]),
        Commands::LstRel(rel) => (
            OperationKind::ListRelation,
            vec![rel.entity1.as_str(), rel.entity2.as_str()],
            rel.params(),
        ),
        Commands::Gen => (OperationKind::Generate, vec![], vec![]),
        Commands::Poll { .. } | Commands::Ping => {
            return Err(BridgeError::Validation(
                "poll and ping are not daemon operations".to_string(),
            ))
        }
    };

    let params = QueryParams::unpack(pairs)?;
    Operation::from_query(kind, &positional, &params)
}

fn report(outcome: &Outcome) -> ExitCode {
    println!("{}", outcome.message());
    match outcome {
        Outcome::Accepted(_) => ExitCode::SUCCESS,
        Outcome::Pending(slot) => {
            tracing::info!("Response still pending on slot {}", slot);
            ExitCode::from(2)
        }
        Outcome::Failed(e) => {
            if e.is_retryable() {
                tracing::warn!("Retryable failure: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
