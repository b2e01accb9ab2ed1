use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::core::client::encoder::{EncodedOutput, EncoderClient, EncoderError};
use crate::core::error::{DisperserError, DisperserResult};

struct EncodeJob {
    data: Bytes,
    cols: u32,
    reply: oneshot::Sender<Result<EncodedOutput, EncoderError>>,
}

/// Fan-out stage between the batcher and the encoder client. Jobs pass
/// through a bounded queue; a full queue blocks `submit`, which pushes
/// backpressure up into the batcher loop. The per-call concurrency cap lives
/// in the encoder client itself.
pub struct EncodingPool {
    jobs: mpsc::Sender<EncodeJob>,
}

impl EncodingPool {
    pub fn new(encoder: Arc<dyn EncoderClient>, queue_size: usize) -> Self {
        let (jobs, mut receiver) = mpsc::channel::<EncodeJob>(queue_size.max(1));

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let encoder = encoder.clone();
                tokio::spawn(async move {
                    let result = encoder.encode_blob(job.data, job.cols).await;
                    // The batcher may have given up on this pull already.
                    let _ = job.reply.send(result);
                });
            }
            debug!("encoding pool drained");
        });

        Self { jobs }
    }

    /// Queues one blob for encoding and returns a handle to its result.
    /// Blocks while the request queue is full.
    pub async fn submit(
        &self,
        data: Bytes,
        cols: u32,
    ) -> DisperserResult<oneshot::Receiver<Result<EncodedOutput, EncoderError>>> {
        let (reply, receiver) = oneshot::channel();
        self.jobs
            .send(EncodeJob { data, cols, reply })
            .await
            .map_err(|_| DisperserError::Internal("encoding pool is shut down".to_string()))?;
        Ok(receiver)
    }
}
