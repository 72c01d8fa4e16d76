//! Configuration for DbProxy.
//!
//! - [`ProxyConfig`]: the YAML configuration file (listen address, backend
//!   nodes, users, per-user schemas and shard rules)
//! - [`store`]: overlay of nodes and users from a remote key/value store
//!
//! # Example
//!
//! ```rust,ignore
//! use dbproxy_config::{ProxyConfig, store::apply_remote};
//!
//! let mut config = ProxyConfig::from_file("etc/proxy.yaml")?;
//! if config.remote_store.is_configured() {
//!     apply_remote(&mut config, &my_store_client)?;
//! }
//! config.validate()?;
//! ```

pub mod config;
pub mod store;

pub use config::{
    NodeConfig, ProxyConfig, RemoteStoreConfig, SchemaConfig, ShardConfig, ShardType, UserConfig,
};
pub use store::{ConfigStore, MemoryStore, RemoteNode, RemoteUser, apply_remote};

/// Load a configuration file and, if given, overlay a remote store onto it.
///
/// The result is validated before it is returned.
pub fn load(
    path: impl AsRef<std::path::Path>,
    store: Option<&dyn ConfigStore>,
) -> dbproxy_core::Result<ProxyConfig> {
    let mut config = ProxyConfig::from_file(path)?;
    if let Some(store) = store {
        apply_remote(&mut config, store)?;
    }
    config.validate()?;
    Ok(config)
}
