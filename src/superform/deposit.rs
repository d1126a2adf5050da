//! Deposit route request body

use ethers::types::Address;
use serde::Serialize;

use crate::superform::serialize_checksummed;

/// Body of `POST /deposit/start`. Field names and casing follow the quote
/// service's wire format; addresses go out checksummed.
#[derive(Debug, Clone, Serialize)]
pub struct DepositRouteRequest {
    #[serde(serialize_with = "serialize_checksummed")]
    pub user_address: Address,
    #[serde(serialize_with = "serialize_checksummed")]
    pub from_token_address: Address,
    pub from_chain_id: u64,
    /// Human-denominated amount of the source token, e.g. "0.005"
    pub amount_in: String,
    #[serde(serialize_with = "serialize_checksummed")]
    pub refund_address: Address,
    pub vault_id: String,
    pub bridge_slippage: u32,
    pub swap_slippage: u32,
    pub route_type: String,
    pub exclude_ambs: Vec<u32>,
    pub exclude_liquidity_providers: Vec<u32>,
    pub exclude_dexes: Vec<u32>,
    pub exclude_bridges: Vec<u32>,
}
