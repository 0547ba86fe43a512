//! Alloy-based bridge adapter for EVM destination chains.
//!
//! Submits `relayReceipt(bytes32, bytes)` to the chain's receipt bridge
//! contract and measures confirmations from the transaction receipt and the
//! current block height.

use crate::implementations::ChainProfile;
use crate::BridgeAdapter;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use relay_account::LazyWallet;
use relay_types::{ChainId, DocHash, ReceiptPayload, RelayError, TxHash};
use std::str::FromStr;
use tokio::sync::OnceCell;
use tracing::{debug, info};

sol! {
	#[sol(rpc)]
	contract ReceiptBridge {
		event ReceiptRelayed(bytes32 indexed docHash, bytes32 txHash, uint256 timestamp);

		function relayReceipt(bytes32 docHash, bytes receiptData) external returns (bytes32 id);
	}
}

/// Utility function to truncate a transaction hash for display.
fn truncate_hash(hash: &TxHash) -> String {
	let hash_str = hex_string(hash);
	format!("{}..", &hash_str[..10])
}

fn hex_string(hash: &TxHash) -> String {
	format!("{:#x}", hash)
}

/// Blocks mined on top of (and including) the receipt's block.
pub fn confirmation_depth(current_block: u64, receipt_block: u64) -> u64 {
	current_block.saturating_add(1).saturating_sub(receipt_block)
}

/// Bridge adapter for one EVM chain.
///
/// Reads go through a plain HTTP provider created with the adapter. The
/// signing provider is only built on the first relay, once the wallet has
/// been constructed, and is reused afterwards.
pub struct EvmBridgeAdapter {
	/// Chain this adapter relays to.
	chain: ChainId,
	/// Confirmation threshold and gas budget for the chain.
	profile: ChainProfile,
	/// RPC endpoint shared by both providers.
	rpc_url: Url,
	/// Receipt bridge contract address.
	bridge_address: Address,
	/// Signing key, parsed on first relay.
	wallet: LazyWallet,
	/// Provider used for confirmation queries.
	read_provider: DynProvider,
	/// Wallet-backed provider, built on first relay.
	signing_provider: OnceCell<DynProvider>,
}

impl EvmBridgeAdapter {
	/// Creates an adapter. Fails only on malformed settings; nothing is
	/// contacted and the key is not parsed yet.
	pub fn new(
		profile: ChainProfile,
		rpc_url: &str,
		bridge_address: &str,
		private_key: Option<String>,
	) -> Result<Self, RelayError> {
		let chain = ChainId::new(profile.name);
		let url: Url = rpc_url.parse().map_err(|e| {
			RelayError::Configuration(format!("{}: invalid RPC URL: {}", chain, e))
		})?;
		let bridge_address = Address::from_str(bridge_address).map_err(|e| {
			RelayError::Configuration(format!("{}: invalid bridge address: {}", chain, e))
		})?;

		let read_provider = ProviderBuilder::new().connect_http(url.clone()).erased();

		Ok(Self {
			chain,
			profile,
			rpc_url: url,
			bridge_address,
			wallet: LazyWallet::new(private_key),
			read_provider,
			signing_provider: OnceCell::new(),
		})
	}

	pub fn profile(&self) -> &ChainProfile {
		&self.profile
	}

	pub fn bridge_address(&self) -> Address {
		self.bridge_address
	}

	pub fn signer_initialized(&self) -> bool {
		self.wallet.is_initialized()
	}

	async fn signing_provider(&self) -> Result<&DynProvider, RelayError> {
		self.signing_provider
			.get_or_try_init(|| async {
				let wallet = self.wallet.wallet().await.map_err(|e| {
					RelayError::Configuration(format!("{}: {}", self.chain, e))
				})?;
				info!(
					chain = %self.chain,
					signer = %wallet.address(),
					"Initialized signing provider"
				);
				let provider = ProviderBuilder::new()
					.wallet(wallet.ethereum_wallet())
					.connect_http(self.rpc_url.clone())
					.erased();
				Ok::<_, RelayError>(provider)
			})
			.await
	}
}

#[async_trait]
impl BridgeAdapter for EvmBridgeAdapter {
	fn chain(&self) -> &ChainId {
		&self.chain
	}

	fn required_confirmations(&self) -> u64 {
		self.profile.required_confirmations
	}

	async fn relay_receipt(
		&self,
		doc_hash: &DocHash,
		receipt_data: &ReceiptPayload,
	) -> Result<TxHash, RelayError> {
		let provider = self.signing_provider().await?;
		let bridge = ReceiptBridge::new(self.bridge_address, provider.clone());
		let data = Bytes::from(receipt_data.canonical_bytes());

		debug!(
			chain = %self.chain,
			doc_hash = %doc_hash,
			bytes = data.len(),
			gas_limit = self.profile.gas_limit,
			"Sending relayReceipt"
		);

		let pending = bridge
			.relayReceipt(*doc_hash, data)
			.gas(self.profile.gas_limit)
			.send()
			.await
			.map_err(|e| {
				RelayError::transaction(&self.chain, format!("failed to send transaction: {}", e))
			})?;

		let tx_hash = *pending.tx_hash();
		info!(chain = %self.chain, tx_hash = %truncate_hash(&tx_hash), "Submitted relay transaction");

		let receipt = pending
			.with_required_confirmations(1)
			.get_receipt()
			.await
			.map_err(|e| {
				RelayError::transaction(
					&self.chain,
					format!("failed to confirm {}: {}", hex_string(&tx_hash), e),
				)
			})?;

		if !receipt.status() {
			return Err(RelayError::transaction(
				&self.chain,
				format!("transaction {} reverted", hex_string(&tx_hash)),
			));
		}

		Ok(receipt.transaction_hash)
	}

	async fn get_confirmations(&self, tx_hash: &TxHash) -> Result<u64, RelayError> {
		let query_error = |e: alloy::transports::TransportError| {
			RelayError::confirmation_query(&self.chain, e)
		};

		let transaction = self
			.read_provider
			.get_transaction_by_hash(*tx_hash)
			.await
			.map_err(query_error)?;
		if transaction.is_none() {
			debug!(chain = %self.chain, tx_hash = %truncate_hash(tx_hash), "Transaction not found");
			return Ok(0);
		}

		let receipt = self
			.read_provider
			.get_transaction_receipt(*tx_hash)
			.await
			.map_err(query_error)?;
		let Some(receipt_block) = receipt.and_then(|r| r.block_number) else {
			debug!(chain = %self.chain, tx_hash = %truncate_hash(tx_hash), "Transaction not yet mined");
			return Ok(0);
		};

		let current_block = self
			.read_provider
			.get_block_number()
			.await
			.map_err(query_error)?;

		Ok(confirmation_depth(current_block, receipt_block))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::{arbitrum, optimism, polygon};
	use serde_json::json;
	use serde_json::Value;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer, Request, ResponseTemplate};

	const BRIDGE: &str = "0x742d35Cc6634C0532925a3b8D6Ac6c001afb7f9c";
	// Nothing listens on port 1.
	const DEAD_RPC: &str = "http://127.0.0.1:1";

	const TX: &str = "0xabababababababababababababababababababababababababababababababab";
	const BLOCK_HASH: &str = "0x5555555555555555555555555555555555555555555555555555555555555555";
	const SENDER: &str = "0x0000000000000000000000000000000000000001";

	fn adapter(profile: ChainProfile, rpc_url: &str, key: Option<&str>) -> EvmBridgeAdapter {
		EvmBridgeAdapter::new(profile, rpc_url, BRIDGE, key.map(str::to_string)).unwrap()
	}

	/// Answers a JSON-RPC call with `result`, echoing the request id.
	fn rpc_result(result: Value) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
		move |request: &Request| {
			let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
			ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0",
				"id": body["id"],
				"result": result
			}))
		}
	}

	async fn mount_rpc(server: &MockServer, rpc_method: &str, result: Value) {
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": rpc_method})))
			.respond_with(rpc_result(result))
			.mount(server)
			.await;
	}

	fn mined_transaction() -> Value {
		json!({
			"type": "0x2",
			"chainId": "0xa4b1",
			"nonce": "0x7",
			"gas": "0xf4240",
			"maxFeePerGas": "0x3b9aca00",
			"maxPriorityFeePerGas": "0x0",
			"gasPrice": "0x3b9aca00",
			"to": BRIDGE,
			"value": "0x0",
			"input": "0x",
			"accessList": [],
			"v": "0x0",
			"yParity": "0x0",
			"r": "0x1111111111111111111111111111111111111111111111111111111111111111",
			"s": "0x2222222222222222222222222222222222222222222222222222222222222222",
			"hash": TX,
			"from": SENDER,
			"blockHash": BLOCK_HASH,
			"blockNumber": "0x64",
			"transactionIndex": "0x0"
		})
	}

	fn receipt_at_block_0x64() -> Value {
		json!({
			"type": "0x2",
			"status": "0x1",
			"cumulativeGasUsed": "0x5208",
			"logs": [],
			"logsBloom": format!("0x{}", "0".repeat(512)),
			"transactionHash": TX,
			"transactionIndex": "0x0",
			"blockHash": BLOCK_HASH,
			"blockNumber": "0x64",
			"gasUsed": "0x5208",
			"effectiveGasPrice": "0x3b9aca00",
			"from": SENDER,
			"to": BRIDGE,
			"contractAddress": null
		})
	}

	fn tx_hash() -> TxHash {
		TX.parse().unwrap()
	}

	#[test]
	fn test_confirmation_depth() {
		assert_eq!(confirmation_depth(100, 100), 1);
		assert_eq!(confirmation_depth(119, 100), 20);
		// Receipt from a block the node has not caught up to yet.
		assert_eq!(confirmation_depth(98, 100), 0);
		assert_eq!(confirmation_depth(u64::MAX, 0), u64::MAX);
	}

	#[test]
	fn test_required_confirmations_are_fixed() {
		let arb = adapter(arbitrum::PROFILE, DEAD_RPC, None);
		let op = adapter(optimism::PROFILE, DEAD_RPC, None);
		let poly = adapter(polygon::PROFILE, DEAD_RPC, None);

		for _ in 0..3 {
			assert_eq!(arb.required_confirmations(), 20);
			assert_eq!(op.required_confirmations(), 50);
			assert_eq!(poly.required_confirmations(), 128);
		}
		assert_eq!(arb.chain(), &ChainId::arbitrum());
	}

	#[test]
	fn test_invalid_settings() {
		assert!(matches!(
			EvmBridgeAdapter::new(arbitrum::PROFILE, "not a url", BRIDGE, None),
			Err(RelayError::Configuration(_))
		));
		assert!(matches!(
			EvmBridgeAdapter::new(arbitrum::PROFILE, DEAD_RPC, "0xnope", None),
			Err(RelayError::Configuration(_))
		));
	}

	#[tokio::test]
	async fn test_relay_without_key_is_a_configuration_error() {
		let adapter = adapter(optimism::PROFILE, DEAD_RPC, None);
		let payload = ReceiptPayload::new(json!({"kind": "consent"}));

		let err = adapter
			.relay_receipt(&DocHash::repeat_byte(0x01), &payload)
			.await
			.unwrap_err();

		assert!(matches!(err, RelayError::Configuration(_)));
		assert!(err.to_string().contains("optimism"));
		assert!(!adapter.signer_initialized());
	}

	#[tokio::test]
	async fn test_unknown_transaction_has_zero_confirmations() {
		let server = MockServer::start().await;
		mount_rpc(&server, "eth_getTransactionByHash", Value::Null).await;

		let adapter = adapter(arbitrum::PROFILE, &server.uri(), None);
		let confirmations = adapter.get_confirmations(&tx_hash()).await.unwrap();
		assert_eq!(confirmations, 0);
	}

	#[tokio::test]
	async fn test_unmined_transaction_has_zero_confirmations() {
		let server = MockServer::start().await;
		mount_rpc(&server, "eth_getTransactionByHash", mined_transaction()).await;
		mount_rpc(&server, "eth_getTransactionReceipt", Value::Null).await;
		mount_rpc(&server, "eth_blockNumber", json!("0x77")).await;

		let adapter = adapter(arbitrum::PROFILE, &server.uri(), None);
		let confirmations = adapter.get_confirmations(&tx_hash()).await.unwrap();
		assert_eq!(confirmations, 0);
	}

	#[tokio::test]
	async fn test_mined_transaction_counts_blocks_since_inclusion() {
		let server = MockServer::start().await;
		mount_rpc(&server, "eth_getTransactionByHash", mined_transaction()).await;
		mount_rpc(&server, "eth_getTransactionReceipt", receipt_at_block_0x64()).await;
		mount_rpc(&server, "eth_blockNumber", json!("0x77")).await;

		let adapter = adapter(arbitrum::PROFILE, &server.uri(), None);
		let confirmations = adapter.get_confirmations(&tx_hash()).await.unwrap();

		// Included in block 100, head at 119.
		assert_eq!(confirmations, 20);
		assert_eq!(confirmations, adapter.required_confirmations());
	}

	#[tokio::test]
	async fn test_unreachable_rpc_is_a_query_error() {
		let adapter = adapter(polygon::PROFILE, DEAD_RPC, None);
		let err = adapter
			.get_confirmations(&TxHash::repeat_byte(0xab))
			.await
			.unwrap_err();

		assert!(matches!(err, RelayError::ConfirmationQuery { .. }));
		assert!(err.to_string().starts_with("polygon"));
	}
}
