//! ABI tables and calldata coding for the contracts the executor talks to
//!
//! Four on-chain surfaces: the Zodiac Roles module, the Superform proxy
//! factory, the per-client proxy, and the protocol's router/rewards
//! distributor (the last two only ever decoded, never called directly).
//!
//! Decoding is strict: a leading selector that does not match the expected
//! function is a hard error, never a fallback. Both security-relevant decode
//! sites (withdraw calldata, rewards-claim calldata) go through
//! [`decode_call`].

use ethers::abi::{Function, FunctionExt, Param, ParamType, StateMutability, Token};
use ethers::types::{Address, Bytes, U256};

use crate::error::{Error, Result};

/// Maximum value of a uint48 ABI field
pub const UINT48_MAX: u64 = (1 << 48) - 1;

/// Call operation forwarded to the Safe by the Roles module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    /// Plain CALL from the Safe
    #[default]
    Call,
    /// DELEGATECALL from the Safe; higher privilege, must be explicit
    DelegateCall,
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        match self {
            Operation::Call => 0,
            Operation::DelegateCall => 1,
        }
    }
}

fn param(name: &str, kind: ParamType) -> Param {
    Param {
        name: name.to_string(),
        kind,
        internal_type: None,
    }
}

#[allow(deprecated)]
fn function(
    name: &str,
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    state_mutability: StateMutability,
) -> Function {
    Function {
        name: name.to_string(),
        inputs,
        outputs,
        constant: None,
        state_mutability,
    }
}

/// Parameter layout of the router's LiqRequest struct
fn liq_request_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Bytes,        // txData
        ParamType::Address,      // token
        ParamType::Address,      // interimToken
        ParamType::Uint(8),      // bridgeId
        ParamType::Uint(64),     // liqDstChainId
        ParamType::Uint(256),    // nativeAmount
    ])
}

/// Parameter layout of the router's SingleVaultSFData struct
fn single_vault_sf_data_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint(256), // superformId
        ParamType::Uint(256), // amount
        ParamType::Uint(256), // outputAmount
        ParamType::Uint(256), // maxSlippage
        liq_request_type(),   // liqRequest
        ParamType::Bytes,     // permit2data
        ParamType::Bool,      // hasDstSwap
        ParamType::Bool,      // retain4626
        ParamType::Address,   // receiverAddress
        ParamType::Address,   // receiverAddressSP
        ParamType::Bytes,     // extraFormData
    ])
}

lazy_static::lazy_static! {
    /// Roles module: `execTransactionWithRole(to, value, data, operation, roleKey, shouldRevert)`
    pub static ref ROLES_EXEC_TRANSACTION_WITH_ROLE: Function = function(
        "execTransactionWithRole",
        vec![
            param("to", ParamType::Address),
            param("value", ParamType::Uint(256)),
            param("data", ParamType::Bytes),
            param("operation", ParamType::Uint(8)),
            param("roleKey", ParamType::FixedBytes(32)),
            param("shouldRevert", ParamType::Bool),
        ],
        vec![param("success", ParamType::Bool)],
        StateMutability::NonPayable,
    );

    /// Roles module: the Safe the module executes *as*
    pub static ref ROLES_AVATAR: Function = function(
        "avatar",
        vec![],
        vec![param("", ParamType::Address)],
        StateMutability::View,
    );

    /// Roles module: the Safe the module executes *against*
    pub static ref ROLES_TARGET: Function = function(
        "target",
        vec![],
        vec![param("", ParamType::Address)],
        StateMutability::View,
    );

    /// Proxy factory: `deposit(yieldProtocolCalldata, depositBp, profitBp, sigDeadline, signature)`
    pub static ref FACTORY_DEPOSIT: Function = function(
        "deposit",
        vec![
            param("_yieldProtocolCalldata", ParamType::Bytes),
            param("_clientBasisPointsOfDeposit", ParamType::Uint(48)),
            param("_clientBasisPointsOfProfit", ParamType::Uint(48)),
            param("_p2pSignerSigDeadline", ParamType::Uint(256)),
            param("_p2pSignerSignature", ParamType::Bytes),
        ],
        vec![param("p2pYieldProxyAddress", ParamType::Address)],
        StateMutability::Payable,
    );

    /// Proxy factory: deterministic per-client proxy address
    pub static ref FACTORY_PREDICT_PROXY_ADDRESS: Function = function(
        "predictP2pYieldProxyAddress",
        vec![
            param("_client", ParamType::Address),
            param("_clientBasisPointsOfDeposit", ParamType::Uint(48)),
            param("_clientBasisPointsOfProfit", ParamType::Uint(48)),
        ],
        vec![param("", ParamType::Address)],
        StateMutability::View,
    );

    /// Proxy: `withdraw(superformCalldata)`
    pub static ref PROXY_WITHDRAW: Function = function(
        "withdraw",
        vec![param("_superformCalldata", ParamType::Bytes)],
        vec![],
        StateMutability::NonPayable,
    );

    /// Proxy: `withdrawAccruedRewards(superformCalldata)`
    pub static ref PROXY_WITHDRAW_ACCRUED_REWARDS: Function = function(
        "withdrawAccruedRewards",
        vec![param("_superformCalldata", ParamType::Bytes)],
        vec![],
        StateMutability::NonPayable,
    );

    /// Proxy: on-chain accrued-reward accounting for a position
    pub static ref PROXY_CALCULATE_ACCRUED_REWARDS: Function = function(
        "calculateAccruedRewards",
        vec![
            param("_superformId", ParamType::Uint(256)),
            param("_asset", ParamType::Address),
        ],
        vec![param("", ParamType::Uint(256))],
        StateMutability::View,
    );

    /// Proxy: `batchClaim(periodIds, rewardTokens, amountsClaimed, proofs)`
    pub static ref PROXY_BATCH_CLAIM: Function = function(
        "batchClaim",
        vec![
            param("_periodIds", ParamType::Array(Box::new(ParamType::Uint(256)))),
            param("_rewardTokens", ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::Address))))),
            param("_amountsClaimed", ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::Uint(256)))))),
            param("_proofs", ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::FixedBytes(32)))))),
        ],
        vec![],
        StateMutability::NonPayable,
    );

    /// Superform router: the single-vault same-chain withdraw entry point.
    /// Only decoded, to validate caller-supplied calldata.
    pub static ref ROUTER_SINGLE_VAULT_WITHDRAW: Function = function(
        "singleDirectSingleVaultWithdraw",
        vec![param("req_", ParamType::Tuple(vec![single_vault_sf_data_type()]))],
        vec![],
        StateMutability::Payable,
    );

    /// Rewards distributor: `batchClaim(receiver, periodIds, rewardTokens, amountsClaimed, proofs)`.
    /// Only decoded, to validate quote-service claim transactions.
    pub static ref DISTRIBUTOR_BATCH_CLAIM: Function = function(
        "batchClaim",
        vec![
            param("receiver_", ParamType::Address),
            param("periodIds_", ParamType::Array(Box::new(ParamType::Uint(256)))),
            param("rewardTokens_", ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::Address))))),
            param("amountsClaimed_", ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::Uint(256)))))),
            param("proofs_", ParamType::Array(Box::new(ParamType::Array(Box::new(ParamType::FixedBytes(32)))))),
        ],
        vec![],
        StateMutability::NonPayable,
    );

    /// ERC-4626 vault: `asset()`
    pub static ref ERC4626_ASSET: Function = function(
        "asset",
        vec![],
        vec![param("", ParamType::Address)],
        StateMutability::View,
    );
}

/// ABI-encode a call to `function`, selector included
pub fn encode_call(function: &Function, args: &[Token]) -> Result<Bytes> {
    let data = function.encode_input(args).map_err(|e| Error::Abi {
        function: function.name.clone(),
        message: e.to_string(),
    })?;
    Ok(Bytes::from(data))
}

/// Strictly decode calldata against `function`: the leading four bytes must
/// equal the function's selector
pub fn decode_call(function: &Function, data: &[u8]) -> Result<Vec<Token>> {
    let selector = function.selector();
    if data.len() < 4 || data[..4] != selector {
        let found = if data.len() >= 4 {
            format!("0x{}", hex_bytes(&data[..4]))
        } else {
            format!("0x{}", hex_bytes(data))
        };
        return Err(Error::SelectorMismatch {
            expected: function.name.clone(),
            found,
        });
    }
    function.decode_input(&data[4..]).map_err(|e| Error::Abi {
        function: function.name.clone(),
        message: e.to_string(),
    })
}

/// Decode the return data of a read-only call to `function`
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<Token>> {
    function.decode_output(data).map_err(|e| Error::Abi {
        function: function.name.clone(),
        message: e.to_string(),
    })
}

/// Widen a labeled value into a uint48, failing on anything outside the range.
/// Centralized so every action type validates basis points the same way.
pub fn checked_uint48(label: &'static str, value: u64) -> Result<U256> {
    if value > UINT48_MAX {
        return Err(Error::ValueOutOfRange {
            label,
            value: value.to_string(),
            bits: 48,
        });
    }
    Ok(U256::from(value))
}

/// Coerce a labeled base-10 string (quote-service `value` fields) into a U256
pub fn decimal_u256(label: &'static str, value: &str) -> Result<U256> {
    U256::from_dec_str(value.trim()).map_err(|_| Error::InvalidDecimal {
        label,
        value: value.to_string(),
    })
}

/// A superform id embeds the vault address in its low 160 bits
pub fn superform_id_to_address(superform_id: U256) -> Address {
    let mut buf = [0u8; 32];
    superform_id.to_big_endian(&mut buf);
    Address::from_slice(&buf[12..])
}

fn hex_bytes(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}
