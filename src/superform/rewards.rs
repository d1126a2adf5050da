//! Protocol-rewards claim handling
//!
//! The quote service returns a transaction aimed at the protocol's rewards
//! distributor. The executor never submits that transaction as-is: it decodes
//! the distributor call, verifies the receiver, and re-encodes the same
//! periods/tokens/amounts/proofs against the proxy's own `batchClaim`.

use ethers::abi::Token;
use ethers::types::{Address, Bytes, H256, U256};
use serde::Deserialize;

use crate::abi::{decode_call, encode_call, DISTRIBUTOR_BATCH_CLAIM, PROXY_BATCH_CLAIM};
use crate::error::{Error, Result};

/// Response of `GET /protocolRewards/claim/{chainId}/{user}`. Typed parsing
/// doubles as validation: `transactionData` must be 0x-hex, `to` a 20-byte
/// address.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimTransaction {
    #[serde(rename = "transactionData")]
    pub transaction_data: Bytes,
    pub to: Address,
}

/// A decoded rewards-distributor `batchClaim` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributorBatchClaim {
    pub receiver: Address,
    pub period_ids: Vec<U256>,
    pub reward_tokens: Vec<Vec<Address>>,
    pub amounts_claimed: Vec<Vec<U256>>,
    pub proofs: Vec<Vec<H256>>,
}

fn shape_err(message: String) -> Error {
    Error::Abi {
        function: DISTRIBUTOR_BATCH_CLAIM.name.clone(),
        message,
    }
}

fn as_array(token: Token, context: &str) -> Result<Vec<Token>> {
    match token {
        Token::Array(items) => Ok(items),
        other => Err(shape_err(format!("{context} is not an array: {other:?}"))),
    }
}

fn as_uint(token: Token, context: &str) -> Result<U256> {
    match token {
        Token::Uint(value) => Ok(value),
        other => Err(shape_err(format!("{context} is not a uint: {other:?}"))),
    }
}

fn as_address(token: Token, context: &str) -> Result<Address> {
    match token {
        Token::Address(value) => Ok(value),
        other => Err(shape_err(format!("{context} is not an address: {other:?}"))),
    }
}

fn as_bytes32(token: Token, context: &str) -> Result<H256> {
    match token {
        Token::FixedBytes(bytes) if bytes.len() == 32 => Ok(H256::from_slice(&bytes)),
        other => Err(shape_err(format!("{context} is not bytes32: {other:?}"))),
    }
}

/// Strictly decode a distributor `batchClaim` transaction
pub fn decode_distributor_batch_claim(data: &[u8]) -> Result<DistributorBatchClaim> {
    let mut tokens = decode_call(&DISTRIBUTOR_BATCH_CLAIM, data)?.into_iter();

    let receiver = as_address(
        tokens.next().ok_or_else(|| shape_err("missing receiver_".into()))?,
        "receiver_",
    )?;

    let period_ids = as_array(
        tokens.next().ok_or_else(|| shape_err("missing periodIds_".into()))?,
        "periodIds_",
    )?
    .into_iter()
    .map(|t| as_uint(t, "periodIds_[]"))
    .collect::<Result<Vec<_>>>()?;

    let reward_tokens = as_array(
        tokens.next().ok_or_else(|| shape_err("missing rewardTokens_".into()))?,
        "rewardTokens_",
    )?
    .into_iter()
    .map(|inner| {
        as_array(inner, "rewardTokens_[]")?
            .into_iter()
            .map(|t| as_address(t, "rewardTokens_[][]"))
            .collect::<Result<Vec<_>>>()
    })
    .collect::<Result<Vec<_>>>()?;

    let amounts_claimed = as_array(
        tokens.next().ok_or_else(|| shape_err("missing amountsClaimed_".into()))?,
        "amountsClaimed_",
    )?
    .into_iter()
    .map(|inner| {
        as_array(inner, "amountsClaimed_[]")?
            .into_iter()
            .map(|t| as_uint(t, "amountsClaimed_[][]"))
            .collect::<Result<Vec<_>>>()
    })
    .collect::<Result<Vec<_>>>()?;

    let proofs = as_array(
        tokens.next().ok_or_else(|| shape_err("missing proofs_".into()))?,
        "proofs_",
    )?
    .into_iter()
    .map(|inner| {
        as_array(inner, "proofs_[]")?
            .into_iter()
            .map(|t| as_bytes32(t, "proofs_[][]"))
            .collect::<Result<Vec<_>>>()
    })
    .collect::<Result<Vec<_>>>()?;

    Ok(DistributorBatchClaim {
        receiver,
        period_ids,
        reward_tokens,
        amounts_claimed,
        proofs,
    })
}

impl DistributorBatchClaim {
    /// The four claim arrays as ABI tokens, shared by both encode directions
    fn array_tokens(&self) -> [Token; 4] {
        let period_ids = Token::Array(self.period_ids.iter().map(|v| Token::Uint(*v)).collect());
        let reward_tokens = Token::Array(
            self.reward_tokens
                .iter()
                .map(|tokens| Token::Array(tokens.iter().map(|a| Token::Address(*a)).collect()))
                .collect(),
        );
        let amounts_claimed = Token::Array(
            self.amounts_claimed
                .iter()
                .map(|amounts| Token::Array(amounts.iter().map(|v| Token::Uint(*v)).collect()))
                .collect(),
        );
        let proofs = Token::Array(
            self.proofs
                .iter()
                .map(|proof| {
                    Token::Array(
                        proof
                            .iter()
                            .map(|h| Token::FixedBytes(h.as_bytes().to_vec()))
                            .collect(),
                    )
                })
                .collect(),
        );
        [period_ids, reward_tokens, amounts_claimed, proofs]
    }
}

/// Re-encode a decoded claim against the proxy's `batchClaim` (same arrays,
/// no receiver: the proxy claims for itself)
pub fn encode_proxy_batch_claim(claim: &DistributorBatchClaim) -> Result<Bytes> {
    encode_call(&PROXY_BATCH_CLAIM, &claim.array_tokens())
}

/// Build distributor `batchClaim` calldata for tests elsewhere in the crate
#[cfg(test)]
pub(crate) fn distributor_batch_claim_calldata(claim: &DistributorBatchClaim) -> Vec<u8> {
    let [period_ids, reward_tokens, amounts_claimed, proofs] = claim.array_tokens();
    encode_call(
        &DISTRIBUTOR_BATCH_CLAIM,
        &[
            Token::Address(claim.receiver),
            period_ids,
            reward_tokens,
            amounts_claimed,
            proofs,
        ],
    )
    .unwrap()
    .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_claim(receiver: Address) -> DistributorBatchClaim {
        DistributorBatchClaim {
            receiver,
            period_ids: vec![U256::from(3u64), U256::from(4u64)],
            reward_tokens: vec![
                vec![Address::from_str("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").unwrap()],
                vec![Address::from_str("0x4200000000000000000000000000000000000006").unwrap()],
            ],
            amounts_claimed: vec![
                vec![U256::from(1_000_000u64)],
                vec![U256::from(250u64)],
            ],
            proofs: vec![
                vec![H256::repeat_byte(0xaa), H256::repeat_byte(0xbb)],
                vec![H256::repeat_byte(0xcc)],
            ],
        }
    }

    #[test]
    fn test_decode_recovers_distributor_claim() {
        let receiver =
            Address::from_str("0x8D1a5E9FE73529c4444Aa07ABD6D76C98d32394b").unwrap();
        let claim = sample_claim(receiver);
        let data = distributor_batch_claim_calldata(&claim);
        let decoded = decode_distributor_batch_claim(&data).unwrap();
        assert_eq!(decoded, claim);
    }

    #[test]
    fn test_decode_rejects_non_batch_claim_calldata() {
        // A withdraw selector must not be accepted as claim data
        let data = [0x40, 0x7c, 0x7b, 0x1d, 0x00];
        let err = decode_distributor_batch_claim(&data).unwrap_err();
        assert!(matches!(err, Error::SelectorMismatch { .. }));
    }

    #[test]
    fn test_proxy_reencode_drops_receiver_and_keeps_arrays() {
        let receiver =
            Address::from_str("0x8D1a5E9FE73529c4444Aa07ABD6D76C98d32394b").unwrap();
        let claim = sample_claim(receiver);
        let data = encode_proxy_batch_claim(&claim).unwrap();

        let tokens = decode_call(&PROXY_BATCH_CLAIM, &data).unwrap();
        assert_eq!(tokens.len(), 4);
        match &tokens[0] {
            Token::Array(ids) => assert_eq!(ids.len(), 2),
            other => panic!("unexpected token: {other:?}"),
        }
        match &tokens[3] {
            Token::Array(proofs) => match &proofs[0] {
                Token::Array(first) => assert_eq!(first.len(), 2),
                other => panic!("unexpected token: {other:?}"),
            },
            other => panic!("unexpected token: {other:?}"),
        }
    }

    #[test]
    fn test_claim_transaction_parse_validates_hex() {
        let ok = r#"{"transactionData": "0xdeadbeef", "to": "0x8D1a5E9FE73529c4444Aa07ABD6D76C98d32394b"}"#;
        let claim: ClaimTransaction = serde_json::from_str(ok).unwrap();
        assert_eq!(claim.transaction_data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);

        let bad_hex = r#"{"transactionData": "zzzz", "to": "0x8D1a5E9FE73529c4444Aa07ABD6D76C98d32394b"}"#;
        assert!(serde_json::from_str::<ClaimTransaction>(bad_hex).is_err());

        let bad_to = r#"{"transactionData": "0x", "to": "not-an-address"}"#;
        assert!(serde_json::from_str::<ClaimTransaction>(bad_to).is_err());
    }
}
