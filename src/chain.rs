//! Chain client boundary
//!
//! The executor never talks JSON-RPC directly; everything goes through the
//! [`ChainClient`] trait so tests can substitute an in-memory chain. The
//! production implementation wraps an ethers HTTP provider with a local
//! signing key.

use async_trait::async_trait;
use ethers::abi::{Function, Token};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionRequest, TxHash};
use tracing::{debug, warn};

use crate::abi::{decode_output, encode_call};
use crate::config::RpcConfig;
use crate::error::{Error, Result};

/// Read/write access to the chain, signed by one account
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the active signing account
    fn signer_address(&self) -> Address;

    /// Chain id the client is configured for
    fn chain_id(&self) -> u64;

    /// Read-only eth_call against `to`
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Submit a signed transaction to `to` and return its hash
    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<TxHash>;

    /// Block until the transaction is mined
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<()>;
}

/// Encode, call, and decode a read-only contract function through a chain client
pub async fn read_function<C: ChainClient + ?Sized>(
    chain: &C,
    to: Address,
    function: &Function,
    args: &[Token],
) -> Result<Vec<Token>> {
    let data = encode_call(function, args)?;
    let output = chain.call(to, data).await?;
    decode_output(function, &output)
}

/// Production chain client: ethers HTTP provider + local signing key
pub struct EthersChain {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    address: Address,
    chain_id: u64,
}

impl EthersChain {
    /// Connect to an RPC endpoint with a hex-encoded private key
    pub fn connect(rpc: &RpcConfig, private_key: &str, chain_id: u64) -> Result<Self> {
        if rpc.batch_requests {
            warn!("rpc.batch_requests is set but the HTTP transport sends requests one at a time");
        }

        let provider = Provider::<Http>::try_from(rpc.endpoint.as_str())
            .map_err(|e| Error::Config(format!("Invalid RPC endpoint {}: {}", rpc.endpoint, e)))?;

        let key = private_key.strip_prefix("0x").unwrap_or(private_key);
        let wallet: LocalWallet = key
            .parse()
            .map_err(|e| Error::Config(format!("Invalid private key: {e}")))?;
        let wallet = wallet.with_chain_id(chain_id);
        let address = wallet.address();

        debug!("Chain client ready: account {address:?} on chain {chain_id}");

        Ok(Self {
            client: SignerMiddleware::new(provider, wallet),
            address,
            chain_id,
        })
    }
}

#[async_trait]
impl ChainClient for EthersChain {
    fn signer_address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::new().to(to).data(data);
        self.client
            .call(&tx.into(), None)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn send_transaction(&self, to: Address, data: Bytes) -> Result<TxHash> {
        let tx = TransactionRequest::new().to(to).data(data);
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| Error::TransactionSend(e.to_string()))?;
        Ok(*pending)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<()> {
        let receipt = PendingTransaction::new(tx_hash, self.client.provider())
            .await
            .map_err(|e| Error::Rpc(format!("Waiting for receipt of {tx_hash:?}: {e}")))?
            .ok_or_else(|| {
                Error::Rpc(format!("Transaction {tx_hash:?} was dropped from the mempool"))
            })?;

        if receipt.status == Some(0.into()) {
            return Err(Error::Rpc(format!("Transaction {tx_hash:?} reverted")));
        }
        Ok(())
    }
}
