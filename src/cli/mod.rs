use clap::{Parser, Subcommand};

pub mod batcher;
pub mod chain;
pub mod database;
pub mod encoder;
pub mod instrumentation;
pub mod ratelimit;
pub mod server;
pub mod storage;
pub mod storage_node;

#[derive(Parser, Debug)]
#[command(
    name = "disperser",
    about = "Data-availability disperser: blob ingestion, batching, encoding fan-out and on-chain confirmation",
    long_about = "The disperser accepts blobs over gRPC, persists them durably, batches and \
    erasure-encodes them through a remote encoder, uploads the encoded payload to the storage \
    cluster, confirms each batch on chain, and tracks finalization.\n\n\
    The `server` command runs the client-facing RPC surface; the `batcher` command runs the \
    asynchronous batching, confirmation and finalization pipeline."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dispersal RPC server
    Server {
        #[command(flatten)]
        run_command: Box<ServerRunCmd>,
    },
    /// Run the batching, confirmation and finalization pipeline
    Batcher {
        #[command(flatten)]
        run_command: Box<BatcherRunCmd>,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct ServerRunCmd {
    #[clap(flatten)]
    pub storage_args: storage::StorageCliArgs,

    #[clap(flatten)]
    pub database_args: database::DatabaseCliArgs,

    #[clap(flatten)]
    pub chain_args: chain::ChainCliArgs,

    #[clap(flatten)]
    pub storage_node_args: storage_node::StorageNodeCliArgs,

    #[clap(flatten)]
    pub server_args: server::ServerCliArgs,

    #[clap(flatten)]
    pub ratelimit_args: ratelimit::RateLimitCliArgs,

    #[clap(flatten)]
    pub instrumentation_args: instrumentation::InstrumentationCliArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct BatcherRunCmd {
    #[clap(flatten)]
    pub storage_args: storage::StorageCliArgs,

    #[clap(flatten)]
    pub database_args: database::DatabaseCliArgs,

    #[clap(flatten)]
    pub chain_args: chain::ChainCliArgs,

    #[clap(flatten)]
    pub storage_node_args: storage_node::StorageNodeCliArgs,

    #[clap(flatten)]
    pub encoder_args: encoder::EncoderCliArgs,

    #[clap(flatten)]
    pub batcher_args: batcher::BatcherCliArgs,

    #[clap(flatten)]
    pub instrumentation_args: instrumentation::InstrumentationCliArgs,
}
