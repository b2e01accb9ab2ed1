use std::str::FromStr;

use alloy::eips::BlockNumberOrTag;
use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::fillers::{ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller};
use alloy::providers::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolValue;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::client::chain::{BatchConfirmation, ChainClient, ChainError};
use crate::types::batch::{BatchHeader, BlobHeader};
use crate::types::params::ChainParams;

sol! {
    #[sol(rpc)]
    contract DAServiceManager {
        event BatchConfirmed(bytes32 indexed batchHeaderHash, uint32 batchId, bytes32 signatoryRecordHash, uint256 fee);

        function confirmBatch(bytes32 blobHeadersRoot, uint32 referenceBlockNumber, bytes blobHeaders) external;
    }
}

type SignerProvider = FillProvider<
    JoinFill<
        JoinFill<JoinFill<JoinFill<Identity, GasFiller>, NonceFiller>, ChainIdFiller>,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

/// Chain client over an Ethereum JSON-RPC endpoint. The confirmer uses it to
/// submit batches; the finalizer and the server's mirror loop use it for
/// finalized-head reads.
pub struct EthereumChainClient {
    provider: SignerProvider,
    service_manager: Address,
    params: ChainParams,
}

impl EthereumChainClient {
    pub fn new(params: ChainParams) -> Result<Self, ChainError> {
        let signer = match &params.private_key {
            Some(key) => {
                PrivateKeySigner::from_str(key).map_err(|e| ChainError::Provider(e.to_string()))?
            }
            // Read-only callers still build a provider; a throwaway key keeps
            // the filler stack uniform and is never used to sign.
            None => PrivateKeySigner::random(),
        };
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new()
            .filler(GasFiller)
            .filler(NonceFiller::default())
            .filler(ChainIdFiller::default())
            .wallet(wallet)
            .on_http(params.rpc_url.clone());

        Ok(Self { provider, service_manager: params.service_manager_address, params })
    }

    /// ABI payload carried alongside the batch header: one
    /// `(commitmentRoot, dataLength, quorumParams)` tuple per blob, with the
    /// quorum params packed as `(id, adversary, quorum)` byte triples.
    fn encode_blob_headers(blob_headers: &[BlobHeader]) -> Bytes {
        let tuples: Vec<(Bytes, u64, Bytes)> = blob_headers
            .iter()
            .map(|h| {
                let mut quorum_params = Vec::with_capacity(3 * h.blob_quorum_infos.len());
                for info in &h.blob_quorum_infos {
                    quorum_params.push(info.security_param.quorum_id);
                    quorum_params.push(info.security_param.adversary_threshold);
                    quorum_params.push(info.security_param.quorum_threshold);
                }
                (Bytes::from(h.commitment_root.clone()), h.data_length, Bytes::from(quorum_params))
            })
            .collect();
        Bytes::from(tuples.abi_encode())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<alloy::rpc::types::TransactionReceipt, ChainError> {
        for round in 0..self.params.receipt_wait_rounds {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {
                    debug!(%tx_hash, round, "batch confirmation receipt not yet available");
                }
                Err(e) => {
                    warn!(%tx_hash, round, error = %e, "receipt poll failed");
                }
            }
            tokio::time::sleep(self.params.receipt_wait_interval).await;
        }
        Err(ChainError::ReceiptTimeout { tx_hash, rounds: self.params.receipt_wait_rounds })
    }
}

#[async_trait]
impl ChainClient for EthereumChainClient {
    async fn confirm_batch(
        &self,
        header: &BatchHeader,
        blob_headers: &[BlobHeader],
    ) -> Result<BatchConfirmation, ChainError> {
        if self.params.private_key.is_none() {
            return Err(ChainError::MissingSigner);
        }

        let contract = DAServiceManager::new(self.service_manager, self.provider.clone());
        let call = contract.confirmBatch(
            header.batch_root,
            header.reference_block_number,
            Self::encode_blob_headers(blob_headers),
        );

        let pending = tokio::time::timeout(self.params.chain_write_timeout, call.send())
            .await
            .map_err(|_| ChainError::Timeout(self.params.chain_write_timeout))?
            .map_err(|e| ChainError::Submission(e.to_string()))?;
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, batch_root = %header.batch_root, "batch confirmation submitted");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.status() {
            return Err(ChainError::Reverted(tx_hash));
        }

        let confirmation_block_number =
            receipt.block_number.ok_or_else(|| ChainError::Provider("receipt without block number".to_string()))?
                as u32;

        let event = receipt
            .inner
            .logs()
            .iter()
            .find_map(|log| log.log_decode::<DAServiceManager::BatchConfirmed>().ok())
            .ok_or(ChainError::MissingConfirmationEvent(tx_hash))?;
        let event = event.inner.data;

        Ok(BatchConfirmation {
            batch_id: event.batchId,
            confirmation_block_number,
            fee: event.fee.to_be_bytes_vec(),
            signatory_record_hash: event.signatoryRecordHash,
        })
    }

    async fn finalized_block_number(&self) -> Result<u64, ChainError> {
        let block = tokio::time::timeout(
            self.params.chain_read_timeout,
            self.provider.get_block_by_number(BlockNumberOrTag::Finalized, false.into()),
        )
        .await
        .map_err(|_| ChainError::Timeout(self.params.chain_read_timeout))?
        .map_err(|e| ChainError::Provider(e.to_string()))?
        .ok_or_else(|| ChainError::Provider("no finalized block returned".to_string()))?;

        Ok(block.header.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::blob::SecurityParam;
    use crate::types::metadata::BlobQuorumInfo;

    #[test]
    fn blob_header_payload_covers_every_blob_and_quorum() {
        let headers = vec![
            BlobHeader {
                commitment_root: vec![0x01; 32],
                data_length: 512,
                blob_quorum_infos: vec![BlobQuorumInfo {
                    security_param: SecurityParam { quorum_id: 0, adversary_threshold: 25, quorum_threshold: 50 },
                    chunk_length: 128,
                }],
            },
            BlobHeader { commitment_root: vec![0x02; 32], data_length: 1024, blob_quorum_infos: vec![] },
        ];

        let payload = EthereumChainClient::encode_blob_headers(&headers);
        let decoded: Vec<(Bytes, u64, Bytes)> = Vec::abi_decode(&payload, true).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].1, 512);
        assert_eq!(decoded[0].2.as_ref(), &[0, 25, 50]);
        assert_eq!(decoded[1].0.as_ref(), &[0x02; 32][..]);
    }
}
