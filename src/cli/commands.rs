//! CLI command implementations

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Confirm;
use ethers::types::{Address, Bytes, H256, U256};
use tracing::info;

use crate::abi::Operation;
use crate::config::Config;
use crate::executor::{
    BatchClaimParams, CallOverrides, DefaultExecutor, DepositParams, PredictProxyAddressParams,
    WithdrawAccruedRewardsParams, WithdrawParams, WithdrawRouteParams,
};

/// Arguments shared by every Roles-mediated action
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Safe the Roles module must be wired to
    #[arg(long)]
    pub safe: Address,

    /// Roles module to execute through
    #[arg(long)]
    pub roles: Address,

    /// Role key override (32-byte hex); defaults to the configured key
    #[arg(long)]
    pub role_key: Option<H256>,

    /// Native value forwarded from the Safe, base-10 wei
    #[arg(long)]
    pub value: Option<String>,

    /// Execute as DELEGATECALL instead of CALL
    #[arg(long)]
    pub delegate_call: bool,

    /// Do not abort the Roles transaction when the inner call fails
    #[arg(long)]
    pub no_revert_on_failure: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl CommonArgs {
    fn overrides(&self) -> Result<CallOverrides> {
        let value = self
            .value
            .as_deref()
            .map(|v| U256::from_dec_str(v).context("--value must be a base-10 integer"))
            .transpose()?;
        Ok(CallOverrides {
            value,
            role_key: self.role_key,
            should_revert_on_failure: self.no_revert_on_failure.then_some(false),
            operation: self.delegate_call.then_some(Operation::DelegateCall),
        })
    }
}

#[derive(Debug, Args)]
pub struct DepositArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Token to deposit from
    #[arg(long)]
    pub from_token: Address,

    /// Human-denominated amount, e.g. 0.005
    #[arg(long)]
    pub amount_in: String,

    /// Destination vault id
    #[arg(long)]
    pub vault_id: String,

    /// Client share of the deposit in basis points
    #[arg(long)]
    pub deposit_bps: u64,

    /// Client share of the profit in basis points
    #[arg(long)]
    pub profit_bps: u64,

    /// Unix deadline of the signer signature
    #[arg(long)]
    pub sig_deadline: u64,

    /// Signer signature over the deposit terms (0x-hex)
    #[arg(long)]
    pub signature: Bytes,

    #[arg(long, default_value_t = 0)]
    pub bridge_slippage: u32,

    #[arg(long, default_value_t = 0)]
    pub swap_slippage: u32,

    #[arg(long, default_value = "output")]
    pub route_type: String,
}

#[derive(Debug, Args)]
pub struct WithdrawArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Proxy holding the position
    #[arg(long)]
    pub proxy: Address,

    /// Router withdraw calldata (0x-hex)
    #[arg(long)]
    pub calldata: Bytes,
}

#[derive(Debug, Args)]
pub struct WithdrawRouteArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Proxy holding the position
    #[arg(long)]
    pub proxy: Address,

    /// Superform id of the position, base-10
    #[arg(long)]
    pub superform_id: String,

    /// SuperPositions amount to withdraw
    #[arg(long)]
    pub amount_in: String,

    /// Token to withdraw into
    #[arg(long)]
    pub to_token: Address,

    /// Vault id of the position
    #[arg(long)]
    pub vault_id: String,

    #[arg(long, default_value_t = 5000)]
    pub bridge_slippage: u32,

    #[arg(long, default_value_t = 5000)]
    pub swap_slippage: u32,

    #[arg(long, default_value_t = 5000)]
    pub positive_slippage: u32,

    /// Withdraw as the underlying ERC-20 instead of native
    #[arg(long)]
    pub erc20: bool,
}

#[derive(Debug, Args)]
pub struct BatchClaimArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Proxy to claim rewards for
    #[arg(long)]
    pub proxy: Address,
}

#[derive(Debug, Args)]
pub struct PredictProxyArgs {
    /// Client (Safe) address
    #[arg(long)]
    pub client: Address,

    #[arg(long)]
    pub deposit_bps: u64,

    #[arg(long)]
    pub profit_bps: u64,

    /// Factory override
    #[arg(long)]
    pub factory: Option<Address>,
}

fn confirm(prompt: &str, yes: bool) -> Result<()> {
    if yes {
        return Ok(());
    }
    let confirmed = Confirm::new()
        .with_prompt(prompt.to_string())
        .default(false)
        .interact()?;
    if !confirmed {
        anyhow::bail!("Aborted by operator");
    }
    Ok(())
}

/// Deposit into a vault via the factory
pub async fn deposit(config: &Config, args: DepositArgs) -> Result<()> {
    let overrides = args.common.overrides()?;
    confirm(
        &format!(
            "Deposit {} of {:?} into vault {} for Safe {:?}?",
            args.amount_in, args.from_token, args.vault_id, args.common.safe
        ),
        args.common.yes,
    )?;

    let executor = DefaultExecutor::from_config(config)?;
    let tx_hash = executor
        .deposit(DepositParams {
            safe_address: args.common.safe,
            roles_address: args.common.roles,
            from_token_address: args.from_token,
            amount_in: args.amount_in,
            vault_id: args.vault_id,
            bridge_slippage: args.bridge_slippage,
            swap_slippage: args.swap_slippage,
            route_type: args.route_type,
            exclude_ambs: vec![],
            exclude_liquidity_providers: vec![],
            exclude_dexes: vec![],
            exclude_bridges: vec![],
            client_basis_points_of_deposit: args.deposit_bps,
            client_basis_points_of_profit: args.profit_bps,
            signer_sig_deadline: U256::from(args.sig_deadline),
            signer_signature: args.signature,
            overrides,
        })
        .await?;

    info!("Deposit confirmed: {tx_hash:#x}");
    println!("{tx_hash:#x}");
    Ok(())
}

/// Withdraw a position with operator-supplied router calldata
pub async fn withdraw(config: &Config, args: WithdrawArgs) -> Result<()> {
    let overrides = args.common.overrides()?;
    confirm(
        &format!(
            "Withdraw via proxy {:?} for Safe {:?}?",
            args.proxy, args.common.safe
        ),
        args.common.yes,
    )?;

    let executor = DefaultExecutor::from_config(config)?;
    let tx_hash = executor
        .withdraw(WithdrawParams {
            safe_address: args.common.safe,
            roles_address: args.common.roles,
            proxy_address: args.proxy,
            superform_calldata: args.calldata,
            overrides,
        })
        .await?;

    info!("Withdraw confirmed: {tx_hash:#x}");
    println!("{tx_hash:#x}");
    Ok(())
}

/// Withdraw a position, quoting the route first
pub async fn withdraw_route(config: &Config, args: WithdrawRouteArgs) -> Result<()> {
    let overrides = args.common.overrides()?;
    confirm(
        &format!(
            "Withdraw {} SuperPositions of {} via proxy {:?}?",
            args.amount_in, args.superform_id, args.proxy
        ),
        args.common.yes,
    )?;

    let executor = DefaultExecutor::from_config(config)?;
    let tx_hash = executor
        .withdraw_with_route(WithdrawRouteParams {
            safe_address: args.common.safe,
            roles_address: args.common.roles,
            proxy_address: args.proxy,
            superform_id: args.superform_id,
            superpositions_amount_in: args.amount_in,
            to_token_address: args.to_token,
            vault_id: args.vault_id,
            bridge_slippage: args.bridge_slippage,
            swap_slippage: args.swap_slippage,
            positive_slippage: args.positive_slippage,
            is_erc20: args.erc20,
            route_type: None,
            overrides,
        })
        .await?;

    info!("Withdraw confirmed: {tx_hash:#x}");
    println!("{tx_hash:#x}");
    Ok(())
}

/// Claim a position's accrued rewards
pub async fn withdraw_rewards(config: &Config, args: WithdrawArgs) -> Result<()> {
    let overrides = args.common.overrides()?;
    confirm(
        &format!(
            "Withdraw accrued rewards via proxy {:?} for Safe {:?}?",
            args.proxy, args.common.safe
        ),
        args.common.yes,
    )?;

    let executor = DefaultExecutor::from_config(config)?;
    let tx_hash = executor
        .withdraw_accrued_rewards(WithdrawAccruedRewardsParams {
            safe_address: args.common.safe,
            roles_address: args.common.roles,
            proxy_address: args.proxy,
            superform_calldata: args.calldata,
            overrides,
        })
        .await?;

    info!("Rewards withdraw confirmed: {tx_hash:#x}");
    println!("{tx_hash:#x}");
    Ok(())
}

/// Claim protocol rewards for the proxy
pub async fn batch_claim(config: &Config, args: BatchClaimArgs) -> Result<()> {
    let overrides = args.common.overrides()?;
    confirm(
        &format!(
            "Batch claim protocol rewards for proxy {:?}?",
            args.proxy
        ),
        args.common.yes,
    )?;

    let executor = DefaultExecutor::from_config(config)?;
    let tx_hash = executor
        .batch_claim(BatchClaimParams {
            safe_address: args.common.safe,
            roles_address: args.common.roles,
            proxy_address: args.proxy,
            overrides,
        })
        .await?;

    info!("Batch claim confirmed: {tx_hash:#x}");
    println!("{tx_hash:#x}");
    Ok(())
}

/// Print the deterministic proxy address for a client
pub async fn predict_proxy(config: &Config, args: PredictProxyArgs) -> Result<()> {
    let executor = DefaultExecutor::from_config(config)?;
    let address = executor
        .predict_proxy_address(PredictProxyAddressParams {
            client: args.client,
            client_basis_points_of_deposit: args.deposit_bps,
            client_basis_points_of_profit: args.profit_bps,
            factory_address: args.factory,
        })
        .await?;

    println!("{}", ethers::utils::to_checksum(&address, None));
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
