/// Batching pipeline: pull, encode, upload, confirm, finalize.
pub mod batcher;
/// The shared blob/metadata store the pipeline operates on.
pub mod blobstore;
/// CLI arguments for the service.
pub mod cli;
/// Clients, config wiring, errors and wire encodings.
pub mod core;
/// Generated gRPC bindings.
pub mod grpc;
/// Leaky-bucket admission control.
pub mod ratelimit;
/// The dispersal RPC server.
pub mod server;
/// Domain types.
pub mod types;
/// Logging and metrics plumbing.
pub mod utils;

pub use crate::core::error::{DisperserError, DisperserResult};
