//! Action orchestrators
//!
//! One [`Executor`] per operator process composes the quote client, the
//! calldata codecs, and the Roles pipeline. Each public action is a strictly
//! sequential chain of suspension points; nothing is retried and nothing is
//! cached between invocations.

pub mod roles;
pub mod types;

use std::sync::Arc;

use ethers::abi::Token;
use ethers::types::{Address, TxHash, H256, U256};
use ethers::utils::to_checksum;
use tracing::info;

use crate::abi::{
    checked_uint48, decimal_u256, encode_call, superform_id_to_address, ERC4626_ASSET,
    FACTORY_DEPOSIT, FACTORY_PREDICT_PROXY_ADDRESS, PROXY_CALCULATE_ACCRUED_REWARDS,
    PROXY_WITHDRAW, PROXY_WITHDRAW_ACCRUED_REWARDS,
};
use crate::chain::{read_function, ChainClient, EthersChain};
use crate::config::{Config, ExecutorSettings};
use crate::error::{Error, Result};
use crate::superform::rewards::{decode_distributor_batch_claim, encode_proxy_batch_claim};
use crate::superform::withdraw::decode_single_vault_withdraw;
use crate::superform::{DepositRouteRequest, QuoteApi, SuperformApi, WithdrawRouteRequest};

pub use roles::ExecutionRequest;
pub use types::{
    BatchClaimParams, CallOverrides, DepositParams, PredictProxyAddressParams,
    WithdrawAccruedRewardsParams, WithdrawParams, WithdrawRouteParams,
};

/// Constructor-supplied log sink; defaults to `tracing` output
pub type Logger = Arc<dyn Fn(&str) + Send + Sync>;

/// Executes Superform actions on behalf of a Safe through its Roles module
pub struct Executor<C, Q> {
    pub(crate) chain: C,
    quotes: Q,
    proxy_factory_address: Address,
    pub(crate) module_address: Address,
    pub(crate) default_role_key: Option<H256>,
    pub(crate) validate_roles_wiring: bool,
    logger: Option<Logger>,
}

/// The production wiring: ethers chain client + Superform HTTP API
pub type DefaultExecutor = Executor<EthersChain, SuperformApi>;

impl DefaultExecutor {
    /// Build the production executor from validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = ExecutorSettings::resolve(config)?;
        let chain = EthersChain::connect(&config.rpc, &config.signer.private_key, config.chain.id)?;
        let quotes = SuperformApi::new(config.superform.api_key.clone())
            .with_base_url(config.superform.api_url.clone());
        Ok(Executor::new(chain, quotes, settings))
    }
}

impl<C: ChainClient, Q: QuoteApi> Executor<C, Q> {
    /// Wire an executor from any chain client and quote API. Settings are
    /// merged once here; call sites never re-resolve optional fields.
    pub fn new(chain: C, quotes: Q, settings: ExecutorSettings) -> Self {
        let module_address = settings
            .module_address
            .unwrap_or_else(|| chain.signer_address());
        Self {
            chain,
            quotes,
            proxy_factory_address: settings.proxy_factory_address,
            module_address,
            default_role_key: settings.default_role_key,
            validate_roles_wiring: settings.validate_roles_wiring,
            logger: None,
        }
    }

    /// Replace the default `tracing` log sink
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub(crate) fn log_line(&self, message: &str) {
        match &self.logger {
            Some(log) => log(message),
            None => info!("{message}"),
        }
    }

    /// Deposit into a vault: quote the route for the predicted proxy, then
    /// settle through the factory
    pub async fn deposit(&self, params: DepositParams) -> Result<TxHash> {
        let proxy_address = self
            .predict_proxy_address(PredictProxyAddressParams {
                client: params.safe_address,
                client_basis_points_of_deposit: params.client_basis_points_of_deposit,
                client_basis_points_of_profit: params.client_basis_points_of_profit,
                factory_address: None,
            })
            .await?;

        let request = DepositRouteRequest {
            user_address: proxy_address,
            from_token_address: params.from_token_address,
            from_chain_id: self.chain.chain_id(),
            amount_in: params.amount_in,
            refund_address: proxy_address,
            vault_id: params.vault_id,
            bridge_slippage: params.bridge_slippage,
            swap_slippage: params.swap_slippage,
            route_type: params.route_type,
            exclude_ambs: params.exclude_ambs,
            exclude_liquidity_providers: params.exclude_liquidity_providers,
            exclude_dexes: params.exclude_dexes,
            exclude_bridges: params.exclude_bridges,
        };
        let quote = self.quotes.deposit_start(&request).await?;

        // The same basis points predicted the proxy address above; encoding
        // them differently here would settle into a different proxy
        let data = encode_call(
            &FACTORY_DEPOSIT,
            &[
                Token::Bytes(quote.data.to_vec()),
                Token::Uint(checked_uint48(
                    "clientBasisPointsOfDeposit",
                    params.client_basis_points_of_deposit,
                )?),
                Token::Uint(checked_uint48(
                    "clientBasisPointsOfProfit",
                    params.client_basis_points_of_profit,
                )?),
                Token::Uint(params.signer_sig_deadline),
                Token::Bytes(params.signer_signature.to_vec()),
            ],
        )?;

        let value = match params.overrides.value {
            Some(value) => Some(value),
            None if quote.value.is_empty() => None,
            None => Some(decimal_u256("value", &quote.value)?),
        };

        self.log_line(&format!(
            "Deposit via Roles {} -> Safe {} -> Factory {}",
            to_checksum(&params.roles_address, None),
            to_checksum(&params.safe_address, None),
            to_checksum(&self.proxy_factory_address, None),
        ));

        self.execute_via_roles(ExecutionRequest {
            roles_address: params.roles_address,
            target: self.proxy_factory_address,
            data,
            value,
            role_key: params.overrides.role_key,
            should_revert_on_failure: params.overrides.should_revert_on_failure,
            operation: params.overrides.operation,
            expected_safe: Some(params.safe_address),
        })
        .await
    }

    /// Withdraw a position with caller-supplied router calldata
    pub async fn withdraw(&self, params: WithdrawParams) -> Result<TxHash> {
        let data = encode_call(
            &PROXY_WITHDRAW,
            &[Token::Bytes(params.superform_calldata.to_vec())],
        )?;

        self.log_line(&format!(
            "Withdraw via Roles {} -> Safe {} -> Proxy {}",
            to_checksum(&params.roles_address, None),
            to_checksum(&params.safe_address, None),
            to_checksum(&params.proxy_address, None),
        ));

        self.execute_via_roles(ExecutionRequest {
            roles_address: params.roles_address,
            target: params.proxy_address,
            data,
            value: params.overrides.value,
            role_key: params.overrides.role_key,
            should_revert_on_failure: params.overrides.should_revert_on_failure,
            operation: params.overrides.operation,
            expected_safe: Some(params.safe_address),
        })
        .await
    }

    /// Withdraw a position, fetching the router calldata from the quote
    /// service first
    pub async fn withdraw_with_route(&self, params: WithdrawRouteParams) -> Result<TxHash> {
        let chain_id = self.chain.chain_id();
        let request = WithdrawRouteRequest {
            bridge_slippage: params.bridge_slippage,
            filter_swap_routes: false,
            is_erc20: params.is_erc20,
            is_part_of_multi_vault: false,
            need_insurance: true,
            positive_slippage: params.positive_slippage,
            refund_address: params.proxy_address,
            retain_4626: false,
            route_type: params.route_type.unwrap_or_else(|| "output".to_string()),
            superform_id: params.superform_id,
            superpositions_amount_in: params.superpositions_amount_in,
            superpositions_chain_id: chain_id,
            swap_slippage: params.swap_slippage,
            to_chain_id: chain_id,
            to_token_address: params.to_token_address,
            user_address: params.proxy_address,
            vault_id: params.vault_id,
        };
        let route = self.quotes.withdraw_route(&request).await?;

        self.withdraw(WithdrawParams {
            safe_address: params.safe_address,
            roles_address: params.roles_address,
            proxy_address: params.proxy_address,
            superform_calldata: route.data,
            overrides: params.overrides,
        })
        .await
    }

    /// Claim a position's accrued rewards. The caller-supplied calldata must
    /// match the proxy's own accounting exactly; stale or forged inputs are
    /// rejected before anything is submitted.
    pub async fn withdraw_accrued_rewards(
        &self,
        params: WithdrawAccruedRewardsParams,
    ) -> Result<TxHash> {
        let decoded = decode_single_vault_withdraw(&params.superform_calldata)?;
        let asset = self
            .resolve_withdraw_asset(decoded.superform_id, decoded.liq_request_token)
            .await?;

        let tokens = read_function(
            &self.chain,
            params.proxy_address,
            &PROXY_CALCULATE_ACCRUED_REWARDS,
            &[Token::Uint(decoded.superform_id), Token::Address(asset)],
        )
        .await?;
        let accrued = match tokens.into_iter().next() {
            Some(Token::Uint(value)) => value,
            other => {
                return Err(Error::Abi {
                    function: PROXY_CALCULATE_ACCRUED_REWARDS.name.clone(),
                    message: format!("expected uint256 return, got {other:?}"),
                })
            }
        };

        if accrued.is_zero() {
            return Err(Error::NoAccruedRewards {
                superform_id: decoded.superform_id.to_string(),
                asset: to_checksum(&asset, None),
                accrued: accrued.to_string(),
            });
        }
        if decoded.amount != accrued {
            return Err(Error::AccruedRewardsMismatch {
                claimed: decoded.amount.to_string(),
                accrued: accrued.to_string(),
            });
        }

        let data = encode_call(
            &PROXY_WITHDRAW_ACCRUED_REWARDS,
            &[Token::Bytes(params.superform_calldata.to_vec())],
        )?;

        self.log_line(&format!(
            "Withdraw accrued rewards via Roles {} -> Safe {} -> Proxy {}",
            to_checksum(&params.roles_address, None),
            to_checksum(&params.safe_address, None),
            to_checksum(&params.proxy_address, None),
        ));

        self.execute_via_roles(ExecutionRequest {
            roles_address: params.roles_address,
            target: params.proxy_address,
            data,
            value: params.overrides.value,
            role_key: params.overrides.role_key,
            should_revert_on_failure: params.overrides.should_revert_on_failure,
            operation: params.overrides.operation,
            expected_safe: Some(params.safe_address),
        })
        .await
    }

    /// Claim protocol rewards for the proxy. The quote's distributor call is
    /// decoded, its receiver verified, and the arrays re-encoded against the
    /// proxy's own claim entry point.
    pub async fn batch_claim(&self, params: BatchClaimParams) -> Result<TxHash> {
        let claim = self
            .quotes
            .protocol_rewards_claim(self.chain.chain_id(), params.proxy_address)
            .await?;
        let decoded = decode_distributor_batch_claim(&claim.transaction_data)?;

        if decoded.receiver != params.proxy_address {
            return Err(Error::ClaimReceiverMismatch {
                receiver: to_checksum(&decoded.receiver, None),
                expected: to_checksum(&params.proxy_address, None),
            });
        }

        let data = encode_proxy_batch_claim(&decoded)?;

        self.log_line(&format!(
            "Batch claim via Roles {} -> Safe {} -> Proxy {}",
            to_checksum(&params.roles_address, None),
            to_checksum(&params.safe_address, None),
            to_checksum(&params.proxy_address, None),
        ));

        self.execute_via_roles(ExecutionRequest {
            roles_address: params.roles_address,
            target: params.proxy_address,
            data,
            value: params.overrides.value,
            role_key: params.overrides.role_key,
            should_revert_on_failure: params.overrides.should_revert_on_failure,
            operation: params.overrides.operation,
            expected_safe: Some(params.safe_address),
        })
        .await
    }

    /// Read the deterministic per-client proxy address from the factory.
    /// Pure with respect to on-chain state for given inputs.
    pub async fn predict_proxy_address(
        &self,
        params: PredictProxyAddressParams,
    ) -> Result<Address> {
        let factory = params
            .factory_address
            .unwrap_or(self.proxy_factory_address);
        let tokens = read_function(
            &self.chain,
            factory,
            &FACTORY_PREDICT_PROXY_ADDRESS,
            &[
                Token::Address(params.client),
                Token::Uint(checked_uint48(
                    "clientBasisPointsOfDeposit",
                    params.client_basis_points_of_deposit,
                )?),
                Token::Uint(checked_uint48(
                    "clientBasisPointsOfProfit",
                    params.client_basis_points_of_profit,
                )?),
            ],
        )
        .await?;

        match tokens.into_iter().next() {
            Some(Token::Address(address)) => Ok(address),
            other => Err(Error::Abi {
                function: FACTORY_PREDICT_PROXY_ADDRESS.name.clone(),
                message: format!("expected address return, got {other:?}"),
            }),
        }
    }

    /// A zero liquidity-request token means "derive the asset from the vault
    /// embedded in the superform id". The derived address is not verified to
    /// be a deployed vault; a bad id surfaces as a failed read naming it.
    async fn resolve_withdraw_asset(
        &self,
        superform_id: U256,
        liq_request_token: Address,
    ) -> Result<Address> {
        if liq_request_token != Address::zero() {
            return Ok(liq_request_token);
        }

        let vault = superform_id_to_address(superform_id);
        let tokens = read_function(&self.chain, vault, &ERC4626_ASSET, &[])
            .await
            .map_err(|e| {
                Error::Rpc(format!(
                    "Reading asset() of derived vault {}: {e}",
                    to_checksum(&vault, None)
                ))
            })?;

        match tokens.into_iter().next() {
            Some(Token::Address(asset)) => Ok(asset),
            other => Err(Error::Abi {
                function: ERC4626_ASSET.name.clone(),
                message: format!("expected address return, got {other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{decode_call, Operation, ROLES_AVATAR, ROLES_EXEC_TRANSACTION_WITH_ROLE, ROLES_TARGET, PROXY_BATCH_CLAIM, UINT48_MAX};
    use crate::config::default_role_key;
    use crate::superform::rewards::{distributor_batch_claim_calldata, DistributorBatchClaim};
    use crate::superform::withdraw::router_withdraw_calldata;
    use crate::superform::{ClaimTransaction, RouteTransaction};
    use async_trait::async_trait;
    use ethers::abi::encode as abi_encode;
    use ethers::abi::FunctionExt;
    use ethers::types::Bytes;
    use std::str::FromStr;
    use std::sync::Mutex;

    fn addr(tail: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xf0;
        bytes[19] = tail;
        Address::from(bytes)
    }

    fn proxy() -> Address {
        Address::from_str("0x8D1a5E9FE73529c4444Aa07ABD6D76C98d32394b").unwrap()
    }

    /// In-memory chain: answers reads by selector, records every write
    struct MockChain {
        signer: Address,
        avatar: Address,
        target: Address,
        predicted_proxy: Address,
        accrued: U256,
        asset: Address,
        reads: Mutex<Vec<[u8; 4]>>,
        writes: Mutex<Vec<(Address, Bytes)>>,
    }

    impl MockChain {
        fn new(safe: Address) -> Self {
            Self {
                signer: addr(0xaa),
                avatar: safe,
                target: safe,
                predicted_proxy: proxy(),
                accrued: U256::zero(),
                asset: addr(0x77),
                reads: Mutex::new(vec![]),
                writes: Mutex::new(vec![]),
            }
        }

        fn read_selectors(&self) -> Vec<[u8; 4]> {
            self.reads.lock().unwrap().clone()
        }

        fn writes(&self) -> Vec<(Address, Bytes)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        fn signer_address(&self) -> Address {
            self.signer
        }

        fn chain_id(&self) -> u64 {
            8453
        }

        async fn call(&self, _to: Address, data: Bytes) -> crate::error::Result<Bytes> {
            let selector: [u8; 4] = data[..4].try_into().unwrap();
            self.reads.lock().unwrap().push(selector);

            let output = if selector == ROLES_AVATAR.selector() {
                abi_encode(&[Token::Address(self.avatar)])
            } else if selector == ROLES_TARGET.selector() {
                abi_encode(&[Token::Address(self.target)])
            } else if selector == FACTORY_PREDICT_PROXY_ADDRESS.selector() {
                abi_encode(&[Token::Address(self.predicted_proxy)])
            } else if selector == PROXY_CALCULATE_ACCRUED_REWARDS.selector() {
                abi_encode(&[Token::Uint(self.accrued)])
            } else if selector == ERC4626_ASSET.selector() {
                abi_encode(&[Token::Address(self.asset)])
            } else {
                return Err(Error::Rpc(format!("unexpected read {selector:02x?}")));
            };
            Ok(Bytes::from(output))
        }

        async fn send_transaction(
            &self,
            to: Address,
            data: Bytes,
        ) -> crate::error::Result<TxHash> {
            self.writes.lock().unwrap().push((to, data));
            Ok(TxHash::repeat_byte(0x99))
        }

        async fn wait_for_receipt(&self, _tx_hash: TxHash) -> crate::error::Result<()> {
            Ok(())
        }
    }

    /// Canned quote service recording the requests it receives
    struct MockQuotes {
        deposit_response: Option<RouteTransaction>,
        withdraw_response: Option<RouteTransaction>,
        claim_response: Option<ClaimTransaction>,
        deposit_requests: Mutex<Vec<DepositRouteRequest>>,
        withdraw_requests: Mutex<Vec<WithdrawRouteRequest>>,
    }

    impl MockQuotes {
        fn none() -> Self {
            Self {
                deposit_response: None,
                withdraw_response: None,
                claim_response: None,
                deposit_requests: Mutex::new(vec![]),
                withdraw_requests: Mutex::new(vec![]),
            }
        }

        fn with_deposit(data: Bytes, value: &str) -> Self {
            let mut quotes = Self::none();
            quotes.deposit_response = Some(RouteTransaction {
                to: addr(0x01),
                method: "singleDirectSingleVaultDeposit".to_string(),
                data,
                value: value.to_string(),
            });
            quotes
        }

        fn with_withdraw(data: Bytes) -> Self {
            let mut quotes = Self::none();
            quotes.withdraw_response = Some(RouteTransaction {
                to: addr(0x01),
                method: "singleDirectSingleVaultWithdraw".to_string(),
                data,
                value: "0".to_string(),
            });
            quotes
        }

        fn with_claim(claim: ClaimTransaction) -> Self {
            let mut quotes = Self::none();
            quotes.claim_response = Some(claim);
            quotes
        }
    }

    #[async_trait]
    impl QuoteApi for MockQuotes {
        async fn deposit_start(
            &self,
            request: &DepositRouteRequest,
        ) -> crate::error::Result<RouteTransaction> {
            self.deposit_requests.lock().unwrap().push(request.clone());
            self.deposit_response
                .clone()
                .ok_or_else(|| Error::Rpc("unexpected deposit_start".to_string()))
        }

        async fn withdraw_route(
            &self,
            request: &WithdrawRouteRequest,
        ) -> crate::error::Result<RouteTransaction> {
            self.withdraw_requests.lock().unwrap().push(request.clone());
            self.withdraw_response
                .clone()
                .ok_or_else(|| Error::Rpc("unexpected withdraw_route".to_string()))
        }

        async fn protocol_rewards_claim(
            &self,
            _chain_id: u64,
            _user: Address,
        ) -> crate::error::Result<ClaimTransaction> {
            self.claim_response
                .clone()
                .ok_or_else(|| Error::Rpc("unexpected protocol_rewards_claim".to_string()))
        }
    }

    fn executor(chain: MockChain, quotes: MockQuotes) -> Executor<MockChain, MockQuotes> {
        Executor::new(chain, quotes, ExecutorSettings::default())
    }

    fn no_wiring_check() -> ExecutorSettings {
        ExecutorSettings {
            validate_roles_wiring: false,
            ..ExecutorSettings::default()
        }
    }

    fn deposit_params() -> DepositParams {
        DepositParams {
            safe_address: addr(0x03),
            roles_address: addr(0x02),
            from_token_address: Address::from_str(
                "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            )
            .unwrap(),
            amount_in: "0.005".to_string(),
            vault_id: "2GoghTk010_A08iZkKpgg".to_string(),
            bridge_slippage: 0,
            swap_slippage: 0,
            route_type: "output".to_string(),
            exclude_ambs: vec![],
            exclude_liquidity_providers: vec![],
            exclude_dexes: vec![],
            exclude_bridges: vec![],
            client_basis_points_of_deposit: 10_000,
            client_basis_points_of_profit: 9_700,
            signer_sig_deadline: U256::from(123u64),
            signer_signature: Bytes::default(),
            overrides: CallOverrides::default(),
        }
    }

    #[tokio::test]
    async fn test_deposit_routes_quote_calldata_via_roles() {
        let quote_data = Bytes::from(vec![0xb1, 0x9d, 0xcc, 0x33, 0x01, 0x02, 0x03]);
        let exec = Executor::new(
            MockChain::new(addr(0x03)),
            MockQuotes::with_deposit(quote_data.clone(), "0"),
            no_wiring_check(),
        );

        let tx_hash = exec.deposit(deposit_params()).await.unwrap();
        assert_eq!(tx_hash, TxHash::repeat_byte(0x99));

        let writes = exec.chain.writes();
        assert_eq!(writes.len(), 1);
        let (to, data) = &writes[0];
        assert_eq!(*to, addr(0x02));

        let outer = decode_call(&ROLES_EXEC_TRANSACTION_WITH_ROLE, data).unwrap();
        assert_eq!(outer[0], Token::Address(ExecutorSettings::default().proxy_factory_address));
        assert_eq!(outer[1], Token::Uint(U256::zero()));
        assert_eq!(outer[3], Token::Uint(U256::from(Operation::Call.as_u8())));
        assert_eq!(
            outer[4],
            Token::FixedBytes(default_role_key().as_bytes().to_vec())
        );
        assert_eq!(outer[5], Token::Bool(true));

        let inner = match &outer[2] {
            Token::Bytes(bytes) => bytes.clone(),
            other => panic!("unexpected token: {other:?}"),
        };
        let deposit = decode_call(&FACTORY_DEPOSIT, &inner).unwrap();
        assert_eq!(deposit[0], Token::Bytes(quote_data.to_vec()));
        assert_eq!(deposit[1], Token::Uint(U256::from(10_000u64)));
        assert_eq!(deposit[2], Token::Uint(U256::from(9_700u64)));
        assert_eq!(deposit[3], Token::Uint(U256::from(123u64)));
    }

    #[tokio::test]
    async fn test_deposit_quotes_for_the_predicted_proxy() {
        let exec = Executor::new(
            MockChain::new(addr(0x03)),
            MockQuotes::with_deposit(Bytes::from(vec![0x01]), "0"),
            no_wiring_check(),
        );
        exec.deposit(deposit_params()).await.unwrap();

        let requests = exec.quotes.deposit_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_address, proxy());
        assert_eq!(requests[0].refund_address, proxy());
        assert_eq!(requests[0].from_chain_id, 8453);
    }

    #[tokio::test]
    async fn test_deposit_rejects_out_of_range_basis_points() {
        let exec = Executor::new(
            MockChain::new(addr(0x03)),
            MockQuotes::with_deposit(Bytes::from(vec![0x01]), "0"),
            no_wiring_check(),
        );
        let mut params = deposit_params();
        params.client_basis_points_of_profit = UINT48_MAX + 1;

        let err = exec.deposit(params).await.unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange { bits: 48, .. }));
        // Nothing left the process: no reads, no quote, no write
        assert!(exec.chain.read_selectors().is_empty());
        assert!(exec.quotes.deposit_requests.lock().unwrap().is_empty());
        assert!(exec.chain.writes().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_wraps_calldata_for_proxy() {
        let calldata = Bytes::from(vec![0x40, 0x7c, 0x7b, 0x1d, 0xff]);
        let exec = executor(MockChain::new(addr(0x03)), MockQuotes::none());

        exec.withdraw(WithdrawParams {
            safe_address: addr(0x03),
            roles_address: addr(0x02),
            proxy_address: proxy(),
            superform_calldata: calldata.clone(),
            overrides: CallOverrides::default(),
        })
        .await
        .unwrap();

        let writes = exec.chain.writes();
        assert_eq!(writes.len(), 1);
        let outer = decode_call(&ROLES_EXEC_TRANSACTION_WITH_ROLE, &writes[0].1).unwrap();
        assert_eq!(outer[0], Token::Address(proxy()));
        let inner = match &outer[2] {
            Token::Bytes(bytes) => bytes.clone(),
            other => panic!("unexpected token: {other:?}"),
        };
        let withdraw = decode_call(&PROXY_WITHDRAW, &inner).unwrap();
        assert_eq!(withdraw[0], Token::Bytes(calldata.to_vec()));
    }

    #[tokio::test]
    async fn test_withdraw_with_route_fetches_calldata_first() {
        let route_data = Bytes::from(vec![0x40, 0x7c, 0x7b, 0x1d, 0xee]);
        let exec = Executor::new(
            MockChain::new(addr(0x03)),
            MockQuotes::with_withdraw(route_data.clone()),
            no_wiring_check(),
        );

        exec.withdraw_with_route(WithdrawRouteParams {
            safe_address: addr(0x03),
            roles_address: addr(0x02),
            proxy_address: proxy(),
            superform_id: "530603409692258152262377683467427014135305".to_string(),
            superpositions_amount_in: "4477".to_string(),
            to_token_address: Address::from_str(
                "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            )
            .unwrap(),
            vault_id: "2GoghTk010_A08iZkKpgg".to_string(),
            bridge_slippage: 5000,
            swap_slippage: 5000,
            positive_slippage: 5000,
            is_erc20: false,
            route_type: None,
            overrides: CallOverrides::default(),
        })
        .await
        .unwrap();

        let requests = exec.quotes.withdraw_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_address, proxy());
        assert_eq!(requests[0].refund_address, proxy());
        assert_eq!(requests[0].superpositions_chain_id, 8453);
        assert_eq!(requests[0].to_chain_id, 8453);
        assert_eq!(requests[0].route_type, "output");

        let writes = exec.chain.writes();
        assert_eq!(writes.len(), 1);
        let outer = decode_call(&ROLES_EXEC_TRANSACTION_WITH_ROLE, &writes[0].1).unwrap();
        let inner = match &outer[2] {
            Token::Bytes(bytes) => bytes.clone(),
            other => panic!("unexpected token: {other:?}"),
        };
        let withdraw = decode_call(&PROXY_WITHDRAW, &inner).unwrap();
        assert_eq!(withdraw[0], Token::Bytes(route_data.to_vec()));
    }

    #[tokio::test]
    async fn test_wiring_mismatch_blocks_submission() {
        let safe = addr(0x03);
        let mut chain = MockChain::new(safe);
        chain.avatar = addr(0x04); // wired to a different Safe
        let exec = executor(chain, MockQuotes::none());

        let err = exec
            .withdraw(WithdrawParams {
                safe_address: safe,
                roles_address: addr(0x02),
                proxy_address: proxy(),
                superform_calldata: Bytes::from(vec![0x01]),
                overrides: CallOverrides::default(),
            })
            .await
            .unwrap_err();

        match err {
            Error::RolesWiringMismatch {
                avatar, expected, ..
            } => {
                assert_eq!(avatar, to_checksum(&addr(0x04), None));
                assert_eq!(expected, to_checksum(&safe, None));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(exec.chain.writes().is_empty());
    }

    #[tokio::test]
    async fn test_wiring_check_reads_avatar_and_target() {
        let safe = addr(0x03);
        let exec = executor(MockChain::new(safe), MockQuotes::none());

        exec.withdraw(WithdrawParams {
            safe_address: safe,
            roles_address: addr(0x02),
            proxy_address: proxy(),
            superform_calldata: Bytes::from(vec![0x01]),
            overrides: CallOverrides::default(),
        })
        .await
        .unwrap();

        let selectors = exec.chain.read_selectors();
        assert!(selectors.contains(&ROLES_AVATAR.selector()));
        assert!(selectors.contains(&ROLES_TARGET.selector()));
        assert_eq!(exec.chain.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_wiring_check_never_reads() {
        let exec = Executor::new(
            MockChain::new(addr(0x03)),
            MockQuotes::none(),
            no_wiring_check(),
        );

        exec.withdraw(WithdrawParams {
            safe_address: addr(0x03),
            roles_address: addr(0x02),
            proxy_address: proxy(),
            superform_calldata: Bytes::from(vec![0x01]),
            overrides: CallOverrides::default(),
        })
        .await
        .unwrap();

        assert!(exec.chain.read_selectors().is_empty());
    }

    #[tokio::test]
    async fn test_module_account_mismatch_blocks_everything() {
        let settings = ExecutorSettings {
            module_address: Some(addr(0x0b)),
            ..ExecutorSettings::default()
        };
        let exec = Executor::new(MockChain::new(addr(0x03)), MockQuotes::none(), settings);

        let err = exec
            .withdraw(WithdrawParams {
                safe_address: addr(0x03),
                roles_address: addr(0x02),
                proxy_address: proxy(),
                superform_calldata: Bytes::from(vec![0x01]),
                overrides: CallOverrides::default(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ModuleAccountMismatch { .. }));
        assert!(exec.chain.read_selectors().is_empty());
        assert!(exec.chain.writes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_role_key_fails_before_any_network_call() {
        let settings = ExecutorSettings {
            default_role_key: None,
            ..ExecutorSettings::default()
        };
        let exec = Executor::new(MockChain::new(addr(0x03)), MockQuotes::none(), settings);

        let err = exec
            .withdraw(WithdrawParams {
                safe_address: addr(0x03),
                roles_address: addr(0x02),
                proxy_address: proxy(),
                superform_calldata: Bytes::from(vec![0x01]),
                overrides: CallOverrides::default(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingRoleKey));
        assert!(exec.chain.read_selectors().is_empty());
        assert!(exec.chain.writes().is_empty());
    }

    #[tokio::test]
    async fn test_accrued_rewards_mismatch_blocks_submission() {
        let token = addr(0x77);
        let calldata = router_withdraw_calldata(
            U256::from(42u64),
            U256::from(5u64),
            token,
            proxy(),
        );
        let mut chain = MockChain::new(addr(0x03));
        chain.accrued = U256::from(7u64); // proxy accounting disagrees
        let exec = executor(chain, MockQuotes::none());

        let err = exec
            .withdraw_accrued_rewards(WithdrawAccruedRewardsParams {
                safe_address: addr(0x03),
                roles_address: addr(0x02),
                proxy_address: proxy(),
                superform_calldata: Bytes::from(calldata),
                overrides: CallOverrides::default(),
            })
            .await
            .unwrap_err();

        match err {
            Error::AccruedRewardsMismatch { claimed, accrued } => {
                assert_eq!(claimed, "5");
                assert_eq!(accrued, "7");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(exec.chain.writes().is_empty());
    }

    #[tokio::test]
    async fn test_zero_accrued_rewards_blocks_submission() {
        let calldata = router_withdraw_calldata(
            U256::from(42u64),
            U256::from(5u64),
            addr(0x77),
            proxy(),
        );
        let exec = executor(MockChain::new(addr(0x03)), MockQuotes::none());

        let err = exec
            .withdraw_accrued_rewards(WithdrawAccruedRewardsParams {
                safe_address: addr(0x03),
                roles_address: addr(0x02),
                proxy_address: proxy(),
                superform_calldata: Bytes::from(calldata),
                overrides: CallOverrides::default(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoAccruedRewards { .. }));
        assert!(exec.chain.writes().is_empty());
    }

    #[tokio::test]
    async fn test_accrued_rewards_derives_asset_from_zero_token() {
        let calldata = router_withdraw_calldata(
            U256::from(42u64),
            U256::from(7u64),
            Address::zero(),
            proxy(),
        );
        let mut chain = MockChain::new(addr(0x03));
        chain.accrued = U256::from(7u64);
        let exec = executor(chain, MockQuotes::none());

        exec.withdraw_accrued_rewards(WithdrawAccruedRewardsParams {
            safe_address: addr(0x03),
            roles_address: addr(0x02),
            proxy_address: proxy(),
            superform_calldata: Bytes::from(calldata),
            overrides: CallOverrides::default(),
        })
        .await
        .unwrap();

        let selectors = exec.chain.read_selectors();
        assert!(selectors.contains(&ERC4626_ASSET.selector()));
        assert_eq!(exec.chain.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_claim_rejects_foreign_receiver() {
        let foreign = addr(0x0c);
        let claim = DistributorBatchClaim {
            receiver: foreign,
            period_ids: vec![U256::from(1u64)],
            reward_tokens: vec![vec![addr(0x77)]],
            amounts_claimed: vec![vec![U256::from(10u64)]],
            proofs: vec![vec![H256::repeat_byte(0xab)]],
        };
        let exec = executor(
            MockChain::new(addr(0x03)),
            MockQuotes::with_claim(ClaimTransaction {
                transaction_data: Bytes::from(distributor_batch_claim_calldata(&claim)),
                to: addr(0x0d),
            }),
        );

        let err = exec
            .batch_claim(BatchClaimParams {
                safe_address: addr(0x03),
                roles_address: addr(0x02),
                proxy_address: proxy(),
                overrides: CallOverrides::default(),
            })
            .await
            .unwrap_err();

        match err {
            Error::ClaimReceiverMismatch { receiver, expected } => {
                assert_eq!(receiver, to_checksum(&foreign, None));
                assert_eq!(expected, to_checksum(&proxy(), None));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(exec.chain.writes().is_empty());
    }

    #[tokio::test]
    async fn test_batch_claim_reencodes_for_proxy() {
        let claim = DistributorBatchClaim {
            receiver: proxy(),
            period_ids: vec![U256::from(3u64), U256::from(9u64)],
            reward_tokens: vec![vec![addr(0x77)], vec![addr(0x78)]],
            amounts_claimed: vec![vec![U256::from(10u64)], vec![U256::from(20u64)]],
            proofs: vec![vec![H256::repeat_byte(0xab)], vec![H256::repeat_byte(0xcd)]],
        };
        let exec = executor(
            MockChain::new(addr(0x03)),
            MockQuotes::with_claim(ClaimTransaction {
                transaction_data: Bytes::from(distributor_batch_claim_calldata(&claim)),
                to: addr(0x0d),
            }),
        );

        exec.batch_claim(BatchClaimParams {
            safe_address: addr(0x03),
            roles_address: addr(0x02),
            proxy_address: proxy(),
            overrides: CallOverrides::default(),
        })
        .await
        .unwrap();

        let writes = exec.chain.writes();
        assert_eq!(writes.len(), 1);
        let outer = decode_call(&ROLES_EXEC_TRANSACTION_WITH_ROLE, &writes[0].1).unwrap();
        assert_eq!(outer[0], Token::Address(proxy()));
        let inner = match &outer[2] {
            Token::Bytes(bytes) => bytes.clone(),
            other => panic!("unexpected token: {other:?}"),
        };
        let reencoded = decode_call(&PROXY_BATCH_CLAIM, &inner).unwrap();
        assert_eq!(
            reencoded[0],
            Token::Array(vec![
                Token::Uint(U256::from(3u64)),
                Token::Uint(U256::from(9u64))
            ])
        );
    }

    #[tokio::test]
    async fn test_predict_proxy_address_is_idempotent() {
        let exec = executor(MockChain::new(addr(0x03)), MockQuotes::none());
        let params = PredictProxyAddressParams {
            client: addr(0x03),
            client_basis_points_of_deposit: 10_000,
            client_basis_points_of_profit: 9_700,
            factory_address: None,
        };

        let first = exec.predict_proxy_address(params.clone()).await.unwrap();
        let second = exec.predict_proxy_address(params).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, proxy());
    }

    #[tokio::test]
    async fn test_explicit_role_key_and_delegate_call_are_encoded() {
        let custom_key = H256::repeat_byte(0x42);
        let exec = Executor::new(
            MockChain::new(addr(0x03)),
            MockQuotes::none(),
            no_wiring_check(),
        );

        exec.withdraw(WithdrawParams {
            safe_address: addr(0x03),
            roles_address: addr(0x02),
            proxy_address: proxy(),
            superform_calldata: Bytes::from(vec![0x01]),
            overrides: CallOverrides {
                value: Some(U256::from(5u64)),
                role_key: Some(custom_key),
                should_revert_on_failure: Some(false),
                operation: Some(Operation::DelegateCall),
            },
        })
        .await
        .unwrap();

        let writes = exec.chain.writes();
        let outer = decode_call(&ROLES_EXEC_TRANSACTION_WITH_ROLE, &writes[0].1).unwrap();
        assert_eq!(outer[1], Token::Uint(U256::from(5u64)));
        assert_eq!(outer[3], Token::Uint(U256::one()));
        assert_eq!(outer[4], Token::FixedBytes(custom_key.as_bytes().to_vec()));
        assert_eq!(outer[5], Token::Bool(false));
    }

    #[tokio::test]
    async fn test_deposit_value_comes_from_quote_when_unset() {
        let exec = Executor::new(
            MockChain::new(addr(0x03)),
            MockQuotes::with_deposit(Bytes::from(vec![0x01]), "12345"),
            no_wiring_check(),
        );
        exec.deposit(deposit_params()).await.unwrap();

        let writes = exec.chain.writes();
        let outer = decode_call(&ROLES_EXEC_TRANSACTION_WITH_ROLE, &writes[0].1).unwrap();
        assert_eq!(outer[1], Token::Uint(U256::from(12_345u64)));
    }
}
