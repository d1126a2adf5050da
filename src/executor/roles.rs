//! Roles execution pipeline and trust guard
//!
//! Every privileged write funnels through [`Executor::execute_via_roles`]:
//! built → guarded → submitted → confirmed, linear, no branching back. The
//! guard never runs after a submission and a failed guard never submits.

use ethers::abi::Token;
use ethers::types::{Address, Bytes, TxHash, H256, U256};
use ethers::utils::to_checksum;
use futures::try_join;

use crate::abi::{
    encode_call, Operation, ROLES_AVATAR, ROLES_EXEC_TRANSACTION_WITH_ROLE, ROLES_TARGET,
};
use crate::chain::{read_function, ChainClient};
use crate::error::{Error, Result};
use crate::superform::QuoteApi;

use super::Executor;

/// A privileged call routed through the Roles module. Constructed fresh per
/// action, never persisted.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub roles_address: Address,
    pub target: Address,
    pub data: Bytes,
    /// Native value forwarded from the Safe; 0 when absent
    pub value: Option<U256>,
    pub role_key: Option<H256>,
    pub should_revert_on_failure: Option<bool>,
    pub operation: Option<Operation>,
    /// Safe the Roles module must be wired to; absence skips the wiring check
    pub expected_safe: Option<Address>,
}

impl<C: ChainClient, Q: QuoteApi> Executor<C, Q> {
    /// Submit a call through the Roles module and block until it is mined
    pub(crate) async fn execute_via_roles(&self, request: ExecutionRequest) -> Result<TxHash> {
        // Everything that can fail without touching the network fails here
        self.ensure_module_account()?;
        let role_key = self.resolve_role_key(request.role_key)?;
        let value = request.value.unwrap_or_default();
        let operation = request.operation.unwrap_or_default();
        let should_revert = request.should_revert_on_failure.unwrap_or(true);

        let data = encode_call(
            &ROLES_EXEC_TRANSACTION_WITH_ROLE,
            &[
                Token::Address(request.target),
                Token::Uint(value),
                Token::Bytes(request.data.to_vec()),
                Token::Uint(U256::from(operation.as_u8())),
                Token::FixedBytes(role_key.as_bytes().to_vec()),
                Token::Bool(should_revert),
            ],
        )?;

        self.assert_roles_wiring(request.roles_address, request.expected_safe)
            .await?;

        self.log_line(&format!(
            "Roles execution -> target {} value={} operation={} role={:#x}",
            to_checksum(&request.target, None),
            value,
            operation.as_u8(),
            role_key,
        ));

        let tx_hash = self
            .chain
            .send_transaction(request.roles_address, data)
            .await?;

        self.log_line(&format!("Waiting for Roles tx {tx_hash:#x}"));
        self.chain.wait_for_receipt(tx_hash).await?;
        self.log_line(&format!("Roles tx confirmed {tx_hash:#x}"));

        Ok(tx_hash)
    }

    /// The signing account must be the identity the Roles module was
    /// provisioned for
    fn ensure_module_account(&self) -> Result<Address> {
        let actual = self.chain.signer_address();
        if actual != self.module_address {
            return Err(Error::ModuleAccountMismatch {
                actual: to_checksum(&actual, None),
                expected: to_checksum(&self.module_address, None),
            });
        }
        Ok(actual)
    }

    fn resolve_role_key(&self, custom: Option<H256>) -> Result<H256> {
        custom
            .or(self.default_role_key)
            .ok_or(Error::MissingRoleKey)
    }

    /// Verify the Roles module is wired to the Safe the caller asserts.
    /// Avatar and target are read concurrently; the result is never cached.
    async fn assert_roles_wiring(
        &self,
        roles_address: Address,
        expected_safe: Option<Address>,
    ) -> Result<()> {
        if !self.validate_roles_wiring {
            return Ok(());
        }
        let Some(safe) = expected_safe else {
            return Ok(());
        };

        let (avatar_tokens, target_tokens) = try_join!(
            read_function(&self.chain, roles_address, &ROLES_AVATAR, &[]),
            read_function(&self.chain, roles_address, &ROLES_TARGET, &[]),
        )
        .map_err(|e| Error::RolesVerification {
            roles: to_checksum(&roles_address, None),
            message: e.to_string(),
        })?;

        let avatar = single_address(avatar_tokens, roles_address, "avatar")?;
        let target = single_address(target_tokens, roles_address, "target")?;

        if avatar != safe || target != safe {
            return Err(Error::RolesWiringMismatch {
                roles: to_checksum(&roles_address, None),
                avatar: to_checksum(&avatar, None),
                target: to_checksum(&target, None),
                expected: to_checksum(&safe, None),
            });
        }
        Ok(())
    }
}

fn single_address(tokens: Vec<Token>, roles_address: Address, accessor: &str) -> Result<Address> {
    match tokens.into_iter().next() {
        Some(Token::Address(address)) => Ok(address),
        other => Err(Error::RolesVerification {
            roles: to_checksum(&roles_address, None),
            message: format!("{accessor}() returned {other:?}, expected an address"),
        }),
    }
}
