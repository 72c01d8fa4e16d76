//! Remote configuration overlay.
//!
//! Operators register backend nodes and database users in a key/value
//! store instead of editing the YAML file. Three keys are read, named after
//! [`RemoteStoreConfig::key_prefix`](crate::RemoteStoreConfig):
//!
//! - `<prefix>_ver`: configuration version string
//! - `<prefix>_nodes`: JSON array of [`RemoteNode`]
//! - `<prefix>_users`: JSON array of [`RemoteUser`]
//!
//! The network client for the store lives with the caller; it only has to
//! implement [`ConfigStore`].

use std::collections::HashMap;

use dbproxy_core::{ConfigError, ConfigErrorKind, Error, Result};
use serde::{Deserialize, Serialize};

use crate::config::{NodeConfig, ProxyConfig, SchemaConfig, UserConfig};

/// Connection limit given to nodes registered in the remote store.
pub const REMOTE_NODE_MAX_CONNS: u32 = 10;
/// Down-detection delay, in seconds, for nodes registered in the remote store.
pub const REMOTE_NODE_DOWN_AFTER: u64 = 10;

/// Read access to a key/value configuration store.
pub trait ConfigStore {
    /// Check the store can be reached. Clients that connect lazily should
    /// connect here.
    fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch a key. `Ok(None)` means the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;
}

/// An in-process store, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }
}

/// A backend node record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNode {
    pub id: u64,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// A database user record, bound to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub node_id: u64,
    #[serde(default)]
    pub db_list: Vec<String>,
}

/// Name given to the node with remote id `id`.
pub fn remote_node_name(id: u64) -> String {
    format!("dnode_{id}")
}

impl From<&RemoteNode> for NodeConfig {
    fn from(node: &RemoteNode) -> Self {
        let addr = format!("{}:{}", node.host, node.port);
        NodeConfig {
            name: remote_node_name(node.id),
            down_after_noalive: REMOTE_NODE_DOWN_AFTER,
            max_conns: REMOTE_NODE_MAX_CONNS,
            user: node.username.clone(),
            password: node.password.clone(),
            master: addr.clone(),
            slave: addr,
        }
    }
}

fn store_error(addr: &str, err: Error) -> Error {
    Error::Config(ConfigError {
        kind: ConfigErrorKind::Store,
        message: format!("configuration store at '{addr}' is unreachable"),
        source: Some(Box::new(err)),
    })
}

fn version_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Fetch and decode a JSON list, logging and returning `None` on any problem.
fn read_list<T: for<'de> Deserialize<'de>>(store: &dyn ConfigStore, key: &str) -> Option<Vec<T>> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::warn!(key, "Remote configuration key is missing");
            return None;
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read remote configuration key");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(list) => Some(list),
        Err(e) => {
            tracing::warn!(key, error = %e, "Malformed remote configuration record");
            None
        }
    }
}

/// Overlay nodes and users from `store` onto `config`.
///
/// The store is pinged first; an unreachable store is an error. The version
/// key is read next; when it is absent or cannot be read the current local
/// time is used as the version. Missing or malformed node/user records are
/// logged and leave the nodes, users and schemas untouched; both lists must
/// decode before either is applied.
///
/// Every remote node becomes `dnode_<id>` with the same address as master
/// and replica. Every remote user gets a proxy user and a schema whose only
/// node, and default, is the node it is bound to.
pub fn apply_remote(config: &mut ProxyConfig, store: &dyn ConfigStore) -> Result<()> {
    store
        .ping()
        .map_err(|e| store_error(&config.remote_store.socket_addr(), e))?;

    let ver_key = config.remote_store.key("ver");
    config.config_ver = match store.get(&ver_key) {
        Ok(Some(ver)) => ver,
        Ok(None) => version_stamp(),
        Err(e) => {
            tracing::warn!(key = %ver_key, error = %e, "Failed to read configuration version");
            version_stamp()
        }
    };

    let nodes_key = config.remote_store.key("nodes");
    let Some(nodes) = read_list::<RemoteNode>(store, &nodes_key) else {
        return Ok(());
    };
    let users_key = config.remote_store.key("users");
    let Some(users) = read_list::<RemoteUser>(store, &users_key) else {
        return Ok(());
    };

    config.nodes.extend(nodes.iter().map(NodeConfig::from));

    for user in &users {
        config.user_list.push(UserConfig {
            user: user.username.clone(),
            password: user.password.clone(),
        });

        let node = remote_node_name(user.node_id);
        config.schema_list.push(SchemaConfig {
            user: user.username.clone(),
            nodes: vec![node.clone()],
            default: node,
            shard_rules: Vec::new(),
            db_list: user.db_list.clone(),
        });
    }

    tracing::debug!(
        version = %config.config_ver,
        nodes = nodes.len(),
        users = users.len(),
        "Applied remote configuration"
    );
    Ok(())
}
