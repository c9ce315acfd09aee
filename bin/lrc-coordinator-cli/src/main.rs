//! Admin CLI for the LRC coordinator.
//!
//! Each invocation is a fresh process: cluster topology and coordinator
//! config are loaded from a JSON cluster file, and file/stripe metadata is
//! loaded from (and saved back to) a JSON snapshot path so state survives
//! across separate `upload`/`upcode`/`downcode`/`decode` calls.
//!
//! The wire protocol in §6 (raw control/data sockets to real data nodes) is
//! out of scope for this workspace (see `lrc_coordinator::Dispatcher`'s doc
//! comment); this binary prints the text commands a real node or gateway
//! would receive and drives the kernel routines with acks assumed
//! successful, so the full plan/commit/metadata lifecycle is still
//! exercised end to end.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lrc_codec::AckVerb;
use lrc_common::{CoordinatorConfig, FileName, NodeId, StripeId};
use lrc_coordinator::{decode::decode_stripe, downcode::downcode_stripe, upcode::upcode_stripe, upload::upload_file};
use lrc_coordinator::dispatch::RecordingDispatcher;
use lrc_meta::{MetaSnapshot, MetaStore};
use lrc_topology::RackTopology;
use tracing::info;

#[derive(Parser)]
#[command(name = "lrc-coordinator-cli", about = "Admin CLI for the LRC rack-aware storage coordinator")]
struct Cli {
    /// Cluster config JSON: `{ "topology": RackTopology, "config": CoordinatorConfig, "gateway": NodeId }`.
    #[arg(long, default_value = "cluster.json")]
    cluster: PathBuf,

    /// Metadata snapshot JSON, read at startup and rewritten on every
    /// command that mutates file or stripe state.
    #[arg(long, default_value = "meta.json")]
    meta: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file from disk, splitting it into hot stripes.
    Upload {
        /// 6-character tenant file name.
        name: String,
        /// Path to the file's bytes on disk.
        input: PathBuf,
    },
    /// Merge a hot stripe's fast local parities into a compact code.
    Upcode {
        /// Stripe id, e.g. `abcdef-0000`.
        stripe: String,
    },
    /// Expand a cold stripe's compact parity back into fast local parities.
    Downcode {
        /// Stripe id, e.g. `abcdef-0000`.
        stripe: String,
    },
    /// Plan (and print) a degraded read of one missing data block.
    Decode {
        /// Stripe id, e.g. `abcdef-0000`.
        stripe: String,
        /// Data block index within the stripe (`0..k`).
        missing_index: u32,
    },
    /// Print every file and stripe currently recorded in the metadata snapshot.
    Status,
}

#[derive(serde::Deserialize, serde::Serialize)]
struct ClusterConfig {
    topology: RackTopology,
    config: CoordinatorConfig,
    gateway: NodeId,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn load_meta(path: &Path) -> Result<MetaStore> {
    if !path.exists() {
        return Ok(MetaStore::new());
    }
    let snapshot: MetaSnapshot = load_json(path)?;
    Ok(MetaStore::from_snapshot(snapshot))
}

fn save_meta(path: &Path, meta: &MetaStore) -> Result<()> {
    let snapshot = meta.snapshot();
    let bytes = serde_json::to_vec_pretty(&snapshot)?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Seed a recording dispatcher with a successful ack for every command it
/// will be asked to send, so the kernel routines' plan/commit logic runs to
/// completion without a real node fleet behind it.
fn optimistic_dispatcher(ack_count: usize, ack: AckVerb) -> RecordingDispatcher {
    let dispatcher = RecordingDispatcher::new();
    for _ in 0..ack_count {
        dispatcher.push_ack(ack.clone());
    }
    dispatcher
}

fn log_commands(dispatcher: &RecordingDispatcher) {
    for (node, command) in dispatcher.commands() {
        info!(%node, command = %command.encode(), "planned command");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let cli = Cli::parse();

    let cluster: ClusterConfig = load_json(&cli.cluster)?;
    let meta = load_meta(&cli.meta)?;

    match cli.command {
        Commands::Upload { name, input } => {
            let file_name = FileName::new(name)?;
            let data = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            let live_per_stripe = (cluster.config.schema.k + cluster.config.schema.l_f) as usize;
            let stripe_count = data.len() / (cluster.config.schema.k as usize * cluster.config.schema.chunk_size as usize);
            let dispatcher = optimistic_dispatcher(stripe_count * live_per_stripe, AckVerb::WriteBlkSuccess);
            let report = upload_file(&dispatcher, &meta, &cluster.topology, &cluster.config, file_name, &data)?;
            log_commands(&dispatcher);
            info!(
                file = %report.file,
                committed = report.committed_stripes.len(),
                failed = report.failed_stripes.len(),
                tail_bytes_dropped = report.tail_bytes_dropped,
                "upload complete"
            );
            save_meta(&cli.meta, &meta)?;
        }
        Commands::Upcode { stripe } => {
            let stripe_id: StripeId = stripe.parse()?;
            let stripe_meta = meta.snapshot_stripe(&stripe_id)?;
            let ack_count = cluster.config.schema.l_c as usize;
            let dispatcher = optimistic_dispatcher(ack_count, AckVerb::FiUpco);
            let outcome = upcode_stripe(&dispatcher, &meta, &cluster.config, cluster.gateway, &stripe_meta)?;
            log_commands(&dispatcher);
            info!(stripe = %outcome.stripe_id, state = ?outcome.state, "upcode complete");
            save_meta(&cli.meta, &meta)?;
        }
        Commands::Downcode { stripe } => {
            let stripe_id: StripeId = stripe.parse()?;
            let stripe_meta = meta.snapshot_stripe(&stripe_id)?;
            let ack_count = cluster.config.schema.l_c as usize;
            let dispatcher = optimistic_dispatcher(ack_count, AckVerb::FiDoco);
            let outcome = downcode_stripe(&dispatcher, &meta, &cluster.config, cluster.gateway, &stripe_meta)?;
            log_commands(&dispatcher);
            info!(stripe = %outcome.stripe_id, state = ?outcome.state, "downcode complete");
            save_meta(&cli.meta, &meta)?;
        }
        Commands::Decode { stripe, missing_index } => {
            let stripe_id: StripeId = stripe.parse()?;
            let stripe_meta = meta.snapshot_stripe(&stripe_id)?;
            let dispatcher = optimistic_dispatcher(1, AckVerb::FiDeco);
            let outcome = decode_stripe(&dispatcher, &cluster.config, &cluster.topology, cluster.gateway, &stripe_meta, missing_index)?;
            log_commands(&dispatcher);
            info!(stripe = %outcome.stripe_id, state = ?outcome.state, "decode complete");
        }
        Commands::Status => {
            let snapshot = meta.snapshot();
            for file in &snapshot.files {
                info!(name = %file.name, size = file.size, hot = file.hot, stripes = file.stripes.len(), "file");
            }
            for stripe in &snapshot.stripes {
                info!(stripe = %stripe.id, state = ?stripe.state, "stripe");
            }
        }
    }

    Ok(())
}
