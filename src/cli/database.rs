use std::time::Duration;

use clap::Args;

use crate::types::params::DatabaseParams;

/// Parameters for the MongoDB metadata store.
#[derive(Debug, Clone, Args)]
pub struct DatabaseCliArgs {
    /// MongoDB connection string
    #[arg(env = "DISPERSER_MONGODB_CONNECTION_URI", long, default_value = "mongodb://localhost:27017")]
    pub mongodb_connection_uri: String,

    /// Database holding the blob metadata collection
    #[arg(env = "DISPERSER_MONGODB_DATABASE_NAME", long, default_value = "disperser")]
    pub mongodb_database_name: String,

    /// Lifetime of metadata rows in seconds; 0 disables expiry
    #[arg(env = "DISPERSER_METADATA_TTL", long, default_value_t = 0)]
    pub metadata_ttl: u64,
}

impl From<&DatabaseCliArgs> for DatabaseParams {
    fn from(args: &DatabaseCliArgs) -> Self {
        Self {
            connection_uri: args.mongodb_connection_uri.clone(),
            database_name: args.mongodb_database_name.clone(),
            ttl: Duration::from_secs(args.metadata_ttl),
        }
    }
}
