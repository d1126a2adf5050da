//! Safe/Roles Executor Library
//!
//! Executes Superform vault actions (deposit, withdraw, reward claims) on
//! behalf of a Safe, routed through a Zodiac Roles module held by a
//! restricted operator key.

pub mod abi;
pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod superform;

// Re-export commonly used types
pub use chain::{ChainClient, EthersChain};
pub use config::{Config, ExecutorSettings};
pub use error::{Error, Result};
pub use executor::{DefaultExecutor, Executor};
pub use superform::{QuoteApi, SuperformApi};
