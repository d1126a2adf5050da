//! Withdraw route request body and router-calldata validation

use ethers::abi::Token;
use ethers::types::{Address, U256};
use serde::Serialize;

use crate::abi::{decode_call, ROUTER_SINGLE_VAULT_WITHDRAW};
use crate::error::{Error, Result};
use crate::superform::serialize_checksummed;

/// Body element of `POST /withdraw/calculate` (the endpoint takes a
/// one-element array of these). Wire casing is snake_case.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawRouteRequest {
    pub bridge_slippage: u32,
    pub filter_swap_routes: bool,
    pub is_erc20: bool,
    pub is_part_of_multi_vault: bool,
    pub need_insurance: bool,
    pub positive_slippage: u32,
    #[serde(serialize_with = "serialize_checksummed")]
    pub refund_address: Address,
    pub retain_4626: bool,
    pub route_type: String,
    pub superform_id: String,
    pub superpositions_amount_in: String,
    pub superpositions_chain_id: u64,
    pub swap_slippage: u32,
    pub to_chain_id: u64,
    #[serde(serialize_with = "serialize_checksummed")]
    pub to_token_address: Address,
    #[serde(serialize_with = "serialize_checksummed")]
    pub user_address: Address,
    pub vault_id: String,
}

/// Fields extracted from a `singleDirectSingleVaultWithdraw` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedVaultWithdraw {
    pub superform_id: U256,
    pub amount: U256,
    /// Asset of the liquidity request; the zero address means "derive the
    /// asset from the vault embedded in the superform id"
    pub liq_request_token: Address,
}

/// Strictly decode caller-supplied router withdraw calldata. Anything that is
/// not a `singleDirectSingleVaultWithdraw` call is rejected.
pub fn decode_single_vault_withdraw(data: &[u8]) -> Result<DecodedVaultWithdraw> {
    let tokens = decode_call(&ROUTER_SINGLE_VAULT_WITHDRAW, data)?;

    let err = |message: &str| Error::Abi {
        function: ROUTER_SINGLE_VAULT_WITHDRAW.name.clone(),
        message: message.to_string(),
    };

    let req = match tokens.into_iter().next() {
        Some(Token::Tuple(fields)) => fields,
        _ => return Err(err("missing req_ tuple")),
    };
    let superform_data = match req.into_iter().next() {
        Some(Token::Tuple(fields)) => fields,
        _ => return Err(err("missing superformData tuple")),
    };
    if superform_data.len() != 11 {
        return Err(err("superformData arity mismatch"));
    }

    let superform_id = match &superform_data[0] {
        Token::Uint(value) => *value,
        _ => return Err(err("superformId is not uint256")),
    };
    let amount = match &superform_data[1] {
        Token::Uint(value) => *value,
        _ => return Err(err("amount is not uint256")),
    };
    let liq_request_token = match &superform_data[4] {
        Token::Tuple(liq_request) => match liq_request.get(1) {
            Some(Token::Address(token)) => *token,
            _ => return Err(err("liqRequest.token is not an address")),
        },
        _ => return Err(err("liqRequest is not a tuple")),
    };

    Ok(DecodedVaultWithdraw {
        superform_id,
        amount,
        liq_request_token,
    })
}

/// Build router withdraw calldata for tests elsewhere in the crate
#[cfg(test)]
pub(crate) fn router_withdraw_calldata(
    superform_id: U256,
    amount: U256,
    liq_token: Address,
    receiver: Address,
) -> Vec<u8> {
    let liq_request = Token::Tuple(vec![
        Token::Bytes(vec![]),
        Token::Address(liq_token),
        Token::Address(Address::zero()),
        Token::Uint(U256::from(1u8)),
        Token::Uint(U256::zero()),
        Token::Uint(U256::zero()),
    ]);
    let superform_data = Token::Tuple(vec![
        Token::Uint(superform_id),
        Token::Uint(amount),
        Token::Uint(amount),
        Token::Uint(U256::from(50u64)),
        liq_request,
        Token::Bytes(vec![]),
        Token::Bool(false),
        Token::Bool(false),
        Token::Address(receiver),
        Token::Address(receiver),
        Token::Bytes(vec![]),
    ]);
    crate::abi::encode_call(
        &ROUTER_SINGLE_VAULT_WITHDRAW,
        &[Token::Tuple(vec![superform_data])],
    )
    .unwrap()
    .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decode_extracts_position_fields() {
        let id = U256::from_str_radix(
            "21050000000181d5cef48bff2dde1b15d6c592ae14383c52d8f6",
            16,
        )
        .unwrap();
        let token = Address::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap();
        let receiver = Address::from_str("0x8D1a5E9FE73529c4444Aa07ABD6D76C98d32394b").unwrap();

        let data = router_withdraw_calldata(id, U256::from(4477u64), token, receiver);
        let decoded = decode_single_vault_withdraw(&data).unwrap();

        assert_eq!(decoded.superform_id, id);
        assert_eq!(decoded.amount, U256::from(4477u64));
        assert_eq!(decoded.liq_request_token, token);
    }

    #[test]
    fn test_decode_rejects_other_router_calls() {
        // A deposit-start quote must never pass the withdraw decode
        let data = [0xb1, 0x9d, 0xcc, 0x33, 0x00, 0x00];
        let err = decode_single_vault_withdraw(&data).unwrap_err();
        assert!(matches!(err, Error::SelectorMismatch { .. }));
    }

    #[test]
    fn test_route_request_serializes_wire_casing() {
        let proxy = Address::from_str("0x8D1a5E9FE73529c4444Aa07ABD6D76C98d32394b").unwrap();
        let request = WithdrawRouteRequest {
            bridge_slippage: 5000,
            filter_swap_routes: false,
            is_erc20: false,
            is_part_of_multi_vault: false,
            need_insurance: true,
            positive_slippage: 5000,
            refund_address: proxy,
            retain_4626: false,
            route_type: "output".to_string(),
            superform_id: "53060340969225815226237768346742701413530550720430230111181046"
                .to_string(),
            superpositions_amount_in: "4477".to_string(),
            superpositions_chain_id: 8453,
            swap_slippage: 5000,
            to_chain_id: 8453,
            to_token_address: Address::from_str(
                "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            )
            .unwrap(),
            user_address: proxy,
            vault_id: "2GoghTk010_A08iZkKpgg".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["retain_4626"], false);
        assert_eq!(json["need_insurance"], true);
        assert_eq!(json["superpositions_amount_in"], "4477");
        assert_eq!(
            json["user_address"],
            "0x8D1a5E9FE73529c4444Aa07ABD6D76C98d32394b"
        );
    }
}
