use tonic::Status;

use crate::core::error::DisperserError;

/// Maps the error taxonomy onto gRPC status codes. Internal details of
/// backend failures stay out of client-visible messages.
impl From<DisperserError> for Status {
    fn from(error: DisperserError) -> Self {
        match error {
            DisperserError::InvalidRequest(message) => Status::invalid_argument(message),
            DisperserError::RateLimitedSystem => Status::resource_exhausted("request ratelimited: system limit"),
            DisperserError::RateLimitedAccount => Status::resource_exhausted("request ratelimited: account limit"),
            DisperserError::NotFound(message) => Status::not_found(message),
            DisperserError::Storage(_)
            | DisperserError::Database(_)
            | DisperserError::StorageNode(_)
            | DisperserError::Chain(_) => Status::unavailable("backend temporarily unavailable"),
            _ => Status::internal("internal error"),
        }
    }
}
