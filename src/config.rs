//! Configuration loading, validation, and one-time resolution

use anyhow::{Context, Result};
use ethers::types::{Address, H256};
use ethers::utils::keccak256;
use serde::Deserialize;
use std::path::Path;

use crate::error::Error;

/// Operator account expected to hold the role key when nothing else is configured
pub const DEFAULT_MODULE_ADDRESS: &str = "0x03264232431031B6484188640ECFF7BdaBDA4b8b";

/// Canonical deployment of the Superform proxy factory
pub const DEFAULT_PROXY_FACTORY_ADDRESS: &str = "0x815B6A7c0b8F4D1c7cdb5031EBe802bf4f7e6d81";

/// Label the built-in role key is derived from
pub const ROLE_KEY_LABEL: &str = "P2P_SUPERFORM_ROLE";

/// Base URL of the Superform quote service
pub const DEFAULT_API_URL: &str = "https://api.superform.xyz";

/// Built-in role key: keccak256 of the fixed label
pub fn default_role_key() -> H256 {
    H256::from(keccak256(ROLE_KEY_LABEL.as_bytes()))
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub signer: SignerConfig,
    #[serde(default)]
    pub superform: SuperformConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    /// Coalesce JSON-RPC requests where the transport supports it
    #[serde(default)]
    pub batch_requests: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            batch_requests: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainConfig {
    /// Chain id transactions are signed for; required
    #[serde(default)]
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignerConfig {
    /// 0x-prefixed 32-byte hex private key of the operator account
    #[serde(default = "default_private_key")]
    pub private_key: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            private_key: default_private_key(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuperformConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for SuperformConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: default_api_key(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolesConfig {
    /// 32-byte hex role key; derived from the fixed label when unset
    #[serde(default)]
    pub default_role_key: Option<String>,
    /// Operator account the Roles module is expected to be used from.
    /// Defaults to the signing account itself.
    #[serde(default)]
    pub module_address: Option<String>,
    /// Verify the Roles module's avatar/target against the asserted Safe
    /// before every privileged write
    #[serde(default = "default_true")]
    pub validate_wiring: bool,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            default_role_key: None,
            module_address: None,
            validate_wiring: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsConfig {
    #[serde(default = "default_factory_address")]
    pub proxy_factory_address: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            proxy_factory_address: default_factory_address(),
        }
    }
}

// Default value functions
fn default_rpc_endpoint() -> String {
    std::env::var("RPC_URL").unwrap_or_default()
}

fn default_private_key() -> String {
    std::env::var("PRIVATE_KEY").unwrap_or_default()
}

fn default_api_key() -> String {
    std::env::var("SF_API_KEY").unwrap_or_default()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_factory_address() -> String {
    DEFAULT_PROXY_FACTORY_ADDRESS.to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path.as_ref()).required(false))
            // Override with environment variables (prefix EXECUTOR_)
            .add_source(
                config::Environment::with_prefix("EXECUTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.rpc.endpoint.is_empty() {
            anyhow::bail!("rpc.endpoint (or RPC_URL) is required");
        }
        let endpoint = url::Url::parse(&self.rpc.endpoint)
            .with_context(|| format!("rpc.endpoint is not a valid URL: {}", self.rpc.endpoint))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            anyhow::bail!("rpc.endpoint must be an http(s) URL");
        }

        if self.chain.id == 0 {
            anyhow::bail!("chain.id is required");
        }

        if self.signer.private_key.is_empty() {
            anyhow::bail!("signer.private_key (or PRIVATE_KEY) is required");
        }
        let key = self
            .signer
            .private_key
            .strip_prefix("0x")
            .unwrap_or(&self.signer.private_key);
        if key.len() != 64 || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("signer.private_key must be a 0x-prefixed 32-byte hex string");
        }

        if let Some(ref role_key) = self.roles.default_role_key {
            role_key
                .parse::<H256>()
                .with_context(|| format!("roles.default_role_key is not 32-byte hex: {role_key}"))?;
        }
        if let Some(ref module) = self.roles.module_address {
            module
                .parse::<Address>()
                .with_context(|| format!("roles.module_address is not an address: {module}"))?;
        }
        self.contracts
            .proxy_factory_address
            .parse::<Address>()
            .with_context(|| {
                format!(
                    "contracts.proxy_factory_address is not an address: {}",
                    self.contracts.proxy_factory_address
                )
            })?;

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  RPC:
    endpoint: {}
    batch_requests: {}
  Chain:
    id: {}
  Signer:
    private_key: {}
  Superform:
    api_url: {}
    api_key: {}
  Roles:
    default_role_key: {}
    module_address: {}
    validate_wiring: {}
  Contracts:
    proxy_factory: {}
"#,
            self.rpc.endpoint,
            self.rpc.batch_requests,
            self.chain.id,
            if self.signer.private_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            self.superform.api_url,
            if self.superform.api_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            self.roles
                .default_role_key
                .as_deref()
                .unwrap_or("(derived from label)"),
            self.roles.module_address.as_deref().unwrap_or("(signer)"),
            self.roles.validate_wiring,
            self.contracts.proxy_factory_address,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            chain: ChainConfig::default(),
            signer: SignerConfig::default(),
            superform: SuperformConfig::default(),
            roles: RolesConfig::default(),
            contracts: ContractsConfig::default(),
        }
    }
}

/// Executor options resolved once at construction (a pure merge of explicit
/// configuration over built-in defaults), so call sites never re-resolve
/// optional fields
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub proxy_factory_address: Address,
    /// Expected signing identity; `None` pins to the signer itself
    pub module_address: Option<Address>,
    pub default_role_key: Option<H256>,
    pub validate_roles_wiring: bool,
}

impl ExecutorSettings {
    /// Resolve settings from validated configuration
    pub fn resolve(config: &Config) -> crate::error::Result<Self> {
        let proxy_factory_address = config
            .contracts
            .proxy_factory_address
            .parse::<Address>()
            .map_err(|e| {
                Error::Config(format!(
                    "contracts.proxy_factory_address {}: {e}",
                    config.contracts.proxy_factory_address
                ))
            })?;

        let module_address = match config.roles.module_address {
            Some(ref module) => Some(module.parse::<Address>().map_err(|e| {
                Error::Config(format!("roles.module_address {module}: {e}"))
            })?),
            None => None,
        };

        let default_role_key = match config.roles.default_role_key {
            Some(ref key) => Some(key.parse::<H256>().map_err(|e| {
                Error::Config(format!("roles.default_role_key {key}: {e}"))
            })?),
            None => Some(default_role_key()),
        };

        Ok(Self {
            proxy_factory_address,
            module_address,
            default_role_key,
            validate_roles_wiring: config.roles.validate_wiring,
        })
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            proxy_factory_address: DEFAULT_PROXY_FACTORY_ADDRESS
                .parse()
                .expect("builtin factory address"),
            module_address: None,
            default_role_key: Some(default_role_key()),
            validate_roles_wiring: true,
        }
    }
}
