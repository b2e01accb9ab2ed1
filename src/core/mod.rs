/// Clients for the external collaborators: object store, metadata store,
/// chain, encoder and storage cluster.
pub mod client;
/// Wiring of clients and parameters into one shared handle.
pub mod config;
/// Error taxonomy of the disperser.
pub mod error;
/// On-chain wire encodings and Merkle trees.
pub mod serialization;
