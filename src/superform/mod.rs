//! Superform quote-service client and protocol calldata handling

pub mod api;
pub mod deposit;
pub mod rewards;
pub mod withdraw;

pub use api::{QuoteApi, RouteTransaction, SuperformApi};
pub use deposit::DepositRouteRequest;
pub use rewards::{ClaimTransaction, DistributorBatchClaim};
pub use withdraw::{DecodedVaultWithdraw, WithdrawRouteRequest};

use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::Serializer;

/// Serialize an address in EIP-55 checksummed form, the way the quote
/// service expects addresses on the wire
pub(crate) fn serialize_checksummed<S>(address: &Address, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_checksum(address, None))
}
