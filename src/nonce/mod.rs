// Core architecture components
mod config;
mod context;
mod error;
mod manager;
mod manager_builder;
mod signed;
mod time_utils;
mod token;
mod validate;

// Counter storage
pub mod storage;

// Keyed hashing
pub mod signature;

// Core components exports
pub use config::{
    ConfigPreset, DEFAULT_PURGE_LIMIT, DEFAULT_SECRET_LEN, DEFAULT_SIGN_HEADER,
    DEFAULT_TIMEOUT_SECS, NonceManagerConfig,
};
pub use context::NonceContext;
pub use error::NonceError;
pub use manager::NonceManager;
pub use manager_builder::SignedNonceManagerBuilder;
pub use signed::SignedNonceManager;
pub use time_utils::TimeProviderFn;
pub use validate::validate_nonce;

// Storage exports
pub use storage::{NonceCountStore, StorageStats};

// Signature exports
pub use signature::{HashAlgorithm, MacLike};
