//! Parameter types for the action orchestrators

use ethers::types::{Address, Bytes, H256, U256};

use crate::abi::Operation;

/// Per-call overrides shared by every Roles-mediated action
#[derive(Debug, Clone, Default)]
pub struct CallOverrides {
    /// Native value forwarded from the Safe to the target call. Defaults to 0.
    pub value: Option<U256>,
    /// Role key to execute under; falls back to the configured default
    pub role_key: Option<H256>,
    /// Whether a failed inner call aborts the Roles transaction. Defaults to
    /// true.
    pub should_revert_on_failure: Option<bool>,
    /// CALL vs DELEGATECALL; defaults to CALL
    pub operation: Option<Operation>,
}

/// Deposit intent: routed through the quote service, settled via the factory
#[derive(Debug, Clone)]
pub struct DepositParams {
    pub safe_address: Address,
    pub roles_address: Address,
    pub from_token_address: Address,
    /// Human-denominated source amount, e.g. "0.005"
    pub amount_in: String,
    pub vault_id: String,
    pub bridge_slippage: u32,
    pub swap_slippage: u32,
    pub route_type: String,
    pub exclude_ambs: Vec<u32>,
    pub exclude_liquidity_providers: Vec<u32>,
    pub exclude_dexes: Vec<u32>,
    pub exclude_bridges: Vec<u32>,
    pub client_basis_points_of_deposit: u64,
    pub client_basis_points_of_profit: u64,
    pub signer_sig_deadline: U256,
    pub signer_signature: Bytes,
    pub overrides: CallOverrides,
}

/// Withdraw with caller-supplied router calldata
#[derive(Debug, Clone)]
pub struct WithdrawParams {
    pub safe_address: Address,
    pub roles_address: Address,
    pub proxy_address: Address,
    pub superform_calldata: Bytes,
    pub overrides: CallOverrides,
}

/// Withdraw with the router calldata fetched from the quote service
#[derive(Debug, Clone)]
pub struct WithdrawRouteParams {
    pub safe_address: Address,
    pub roles_address: Address,
    pub proxy_address: Address,
    pub superform_id: String,
    pub superpositions_amount_in: String,
    pub to_token_address: Address,
    pub vault_id: String,
    pub bridge_slippage: u32,
    pub swap_slippage: u32,
    pub positive_slippage: u32,
    pub is_erc20: bool,
    /// Defaults to "output"
    pub route_type: Option<String>,
    pub overrides: CallOverrides,
}

/// Claim a position's accrued rewards; the calldata must match the proxy's
/// own accounting exactly
#[derive(Debug, Clone)]
pub struct WithdrawAccruedRewardsParams {
    pub safe_address: Address,
    pub roles_address: Address,
    pub proxy_address: Address,
    pub superform_calldata: Bytes,
    pub overrides: CallOverrides,
}

/// Claim protocol rewards for the proxy via the quote service
#[derive(Debug, Clone)]
pub struct BatchClaimParams {
    pub safe_address: Address,
    pub roles_address: Address,
    pub proxy_address: Address,
    pub overrides: CallOverrides,
}

/// Read-only proxy address prediction
#[derive(Debug, Clone)]
pub struct PredictProxyAddressParams {
    pub client: Address,
    pub client_basis_points_of_deposit: u64,
    pub client_basis_points_of_profit: u64,
    /// Override the configured factory
    pub factory_address: Option<Address>,
}
