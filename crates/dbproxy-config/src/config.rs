//! Proxy configuration.
//!
//! The proxy is configured from a YAML file describing the listen address,
//! the backend nodes, the users allowed to connect, and the per-user schema
//! with its shard rules. Backend nodes and users can additionally be
//! overlaid from a remote key/value store, see [`crate::store`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dbproxy_core::{ConfigError, ConfigErrorKind, Error, Result};
use serde::{Deserialize, Serialize};

/// Log levels accepted in `log_level`.
pub const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

/// Top-level proxy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Address the proxy listens on for MySQL clients
    pub addr: String,
    /// Remote store holding node and user records
    #[serde(alias = "redis")]
    pub remote_store: RemoteStoreConfig,
    /// Address for the metrics endpoint (empty = disabled)
    pub prometheus_addr: String,
    /// Users allowed to connect to the proxy
    pub user_list: Vec<UserConfig>,

    /// Admin web API address (empty = disabled)
    pub web_addr: String,
    /// Admin web API user
    pub web_user: String,
    /// Admin web API password
    pub web_password: String,

    /// Log file directory (empty = stderr)
    pub log_path: String,
    /// One of `debug`, `info`, `warn`, `error`
    pub log_level: String,
    /// `on` to log every SQL statement
    pub log_sql: String,
    /// Statements slower than this many milliseconds are logged as slow
    pub slow_log_time: u64,
    /// Comma-separated client IPs/CIDRs allowed to connect (empty = all)
    pub allow_ips: String,
    /// File listing blacklisted SQL fingerprints
    pub blacklist_sql_file: String,
    /// Charset announced to clients
    pub proxy_charset: String,
    /// Backend nodes
    pub nodes: Vec<NodeConfig>,

    /// Per-user schema and shard rules
    pub schema_list: Vec<SchemaConfig>,

    /// Configuration version, usually filled from the remote store
    pub config_ver: String,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:9696".to_string(),
            remote_store: RemoteStoreConfig::default(),
            prometheus_addr: String::new(),
            user_list: Vec::new(),
            web_addr: String::new(),
            web_user: String::new(),
            web_password: String::new(),
            log_path: String::new(),
            log_level: "info".to_string(),
            log_sql: "off".to_string(),
            slow_log_time: 100,
            allow_ips: String::new(),
            blacklist_sql_file: String::new(),
            proxy_charset: "utf8mb4".to_string(),
            nodes: Vec::new(),
            schema_list: Vec::new(),
            config_ver: String::new(),
            path: None,
        }
    }
}

/// Connection settings for the remote configuration store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStoreConfig {
    pub host: String,
    pub port: u16,
    pub db: u32,
    pub password: String,
    /// Keys read are `<prefix>_ver`, `<prefix>_nodes` and `<prefix>_users`
    pub key_prefix: String,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 6379,
            db: 0,
            password: String::new(),
            key_prefix: "cheer_dproxy".to_string(),
        }
    }
}

impl RemoteStoreConfig {
    /// Check if a remote store is configured at all.
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }

    /// Get the socket address string for the store.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full key name for `suffix` (`ver`, `nodes`, `users`).
    pub fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.key_prefix, suffix)
    }
}

/// A user allowed to connect to the proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub user: String,
    pub password: String,
}

/// A backend node: one master and its replicas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub name: String,
    /// Seconds without a successful ping before the node is marked down
    pub down_after_noalive: u64,
    #[serde(rename = "max_conns_limit")]
    pub max_conns: u32,

    pub user: String,
    pub password: String,

    /// `host:port` of the master
    pub master: String,
    /// Comma-separated `host:port` list of replicas
    pub slave: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            down_after_noalive: 10,
            max_conns: 10,
            user: String::new(),
            password: String::new(),
            master: String::new(),
            slave: String::new(),
        }
    }
}

impl NodeConfig {
    /// Replica addresses, skipping empty entries.
    pub fn slaves(&self) -> impl Iterator<Item = &str> {
        self.slave
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Schema of one proxy user: which nodes it may reach and how tables shard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub user: String,
    pub nodes: Vec<String>,
    /// Node receiving statements no shard rule matches
    pub default: String,
    #[serde(rename = "shard")]
    pub shard_rules: Vec<ShardConfig>,
    /// Databases the user may use (empty = all)
    pub db_list: Vec<String>,
}

/// How a sharded table maps key values to nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardType {
    #[default]
    Hash,
    Range,
    DateYear,
    DateMonth,
    DateDay,
}

impl ShardType {
    /// Date shards are listed by `date_range` rather than `locations`.
    pub fn is_date(self) -> bool {
        matches!(
            self,
            ShardType::DateYear | ShardType::DateMonth | ShardType::DateDay
        )
    }
}

/// A shard rule for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    pub db: String,
    pub table: String,
    /// Column holding the shard key
    pub key: String,
    pub nodes: Vec<String>,
    /// Number of sub-tables on each node, parallel to `nodes`
    pub locations: Vec<u32>,
    #[serde(rename = "type")]
    pub kind: ShardType,
    /// Rows per sub-table for range shards
    pub table_row_limit: u64,
    /// Date ranges per node for date shards, parallel to `nodes`
    pub date_range: Vec<String>,
}

fn parse_error(message: String, source: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Config(ConfigError {
        kind: ConfigErrorKind::Parse,
        message,
        source: Some(Box::new(source)),
    })
}

fn invalid(message: impl Into<String>) -> Error {
    Error::config(ConfigErrorKind::Invalid, message)
}

impl ProxyConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| parse_error(format!("invalid proxy configuration: {e}"), e))
    }

    /// Load a configuration file, remembering its path for [`save`](Self::save).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.path = Some(path.to_path_buf());
        tracing::debug!(
            path = %path.display(),
            nodes = config.nodes.len(),
            schemas = config.schema_list.len(),
            "Loaded proxy configuration"
        );
        Ok(config)
    }

    /// File this configuration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Serialize to YAML text.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Serde(e.to_string()))
    }

    /// Write the configuration as YAML to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path.as_ref(), yaml)?;
        tracing::debug!(path = %path.as_ref().display(), "Wrote proxy configuration");
        Ok(())
    }

    /// Write the configuration back to the file it was loaded from.
    ///
    /// Used by the admin API after runtime changes.
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Err(Error::config(
                ConfigErrorKind::NoPath,
                "configuration was not loaded from a file",
            ));
        };
        self.write_to(path)
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Look up the schema of a proxy user.
    pub fn schema_for_user(&self, user: &str) -> Option<&SchemaConfig> {
        self.schema_list.iter().find(|s| s.user == user)
    }

    /// Check cross-references between users, nodes, schemas and shard rules.
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(invalid(format!(
                "log_level '{}' must be one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        let mut names = HashSet::new();
        for node in &self.nodes {
            if node.name.is_empty() {
                return Err(invalid("node without a name"));
            }
            if node.master.is_empty() {
                return Err(invalid(format!("node '{}' has no master", node.name)));
            }
            if !names.insert(node.name.as_str()) {
                return Err(invalid(format!("duplicate node '{}'", node.name)));
            }
        }

        for schema in &self.schema_list {
            for node in &schema.nodes {
                if !names.contains(node.as_str()) {
                    return Err(invalid(format!(
                        "schema of user '{}' references unknown node '{}'",
                        schema.user, node
                    )));
                }
            }
            if !schema.default.is_empty() && !schema.nodes.contains(&schema.default) {
                return Err(invalid(format!(
                    "default node '{}' of user '{}' is not in its node list",
                    schema.default, schema.user
                )));
            }
            for rule in &schema.shard_rules {
                validate_shard_rule(schema, rule)?;
            }
        }

        Ok(())
    }
}

fn validate_shard_rule(schema: &SchemaConfig, rule: &ShardConfig) -> Result<()> {
    if rule.table.is_empty() || rule.key.is_empty() {
        return Err(invalid(format!(
            "shard rule of user '{}' needs both table and key",
            schema.user
        )));
    }
    if let Some(node) = rule.nodes.iter().find(|n| !schema.nodes.contains(n)) {
        return Err(invalid(format!(
            "shard rule for table '{}' uses node '{}' outside the schema",
            rule.table, node
        )));
    }

    let parallel = if rule.kind.is_date() {
        rule.date_range.len()
    } else {
        rule.locations.len()
    };
    if parallel != rule.nodes.len() {
        return Err(invalid(format!(
            "shard rule for table '{}' lists {} nodes but {} {}",
            rule.table,
            rule.nodes.len(),
            parallel,
            if rule.kind.is_date() {
                "date ranges"
            } else {
                "locations"
            }
        )));
    }
    if rule.kind == ShardType::Range && rule.table_row_limit == 0 {
        return Err(invalid(format!(
            "range shard rule for table '{}' needs table_row_limit",
            rule.table
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_YAML: &str = r#"
addr: 0.0.0.0:9696
remote_store:
  host: 127.0.0.1
  port: 6380
  key_prefix: shop
log_level: debug
slow_log_time: 250
allow_ips: 127.0.0.1,192.168.0.0/16
nodes:
  - name: node1
    max_conns_limit: 32
    user: root
    password: secret
    master: 127.0.0.1:3307
    slave: 127.0.0.1:3308, 127.0.0.1:3309
  - name: node2
    user: root
    master: 127.0.0.1:3310
schema_list:
  - user: shop
    nodes: [node1, node2]
    default: node1
    db_list: [shop]
    shard:
      - db: shop
        table: orders
        key: user_id
        type: hash
        nodes: [node1, node2]
        locations: [4, 4]
      - db: shop
        table: events
        key: created_at
        type: date_month
        nodes: [node1, node2]
        date_range: [201901-201906, 201907-201912]
"#;

    #[test]
    fn test_parse_full_config() {
        let config = ProxyConfig::from_yaml(FULL_YAML).unwrap();
        assert_eq!(config.addr, "0.0.0.0:9696");
        assert_eq!(config.remote_store.socket_addr(), "127.0.0.1:6380");
        assert_eq!(config.remote_store.key("nodes"), "shop_nodes");
        assert_eq!(config.slow_log_time, 250);
        assert_eq!(config.nodes.len(), 2);

        let node1 = config.node("node1").unwrap();
        assert_eq!(node1.max_conns, 32);
        assert_eq!(node1.down_after_noalive, 10);
        assert_eq!(
            node1.slaves().collect::<Vec<_>>(),
            vec!["127.0.0.1:3308", "127.0.0.1:3309"]
        );
        assert_eq!(config.node("node2").unwrap().slaves().count(), 0);

        let schema = config.schema_for_user("shop").unwrap();
        assert_eq!(schema.shard_rules.len(), 2);
        assert_eq!(schema.shard_rules[0].kind, ShardType::Hash);
        assert_eq!(schema.shard_rules[1].kind, ShardType::DateMonth);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_for_missing_keys() {
        let config = ProxyConfig::from_yaml("addr: 127.0.0.1:4000\n").unwrap();
        assert_eq!(config.addr, "127.0.0.1:4000");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.proxy_charset, "utf8mb4");
        assert!(!config.remote_store.is_configured());
        assert_eq!(config.remote_store.key("ver"), "cheer_dproxy_ver");
        assert!(config.path().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redis_block_configures_remote_store() {
        let yaml = "addr: 0.0.0.0:9696\nredis:\n  host: 10.0.0.1\n  port: 6380\n  db: 2\n  password: pw\n";
        let config = ProxyConfig::from_yaml(yaml).unwrap();
        assert!(config.remote_store.is_configured());
        assert_eq!(config.remote_store.socket_addr(), "10.0.0.1:6380");
        assert_eq!(config.remote_store.db, 2);
        assert_eq!(config.remote_store.password, "pw");
        assert_eq!(config.remote_store.key("ver"), "cheer_dproxy_ver");
        assert_eq!(config.remote_store.key("nodes"), "cheer_dproxy_nodes");
        assert_eq!(config.remote_store.key("users"), "cheer_dproxy_users");
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = ProxyConfig::from_yaml("nodes: [unclosed").unwrap_err();
        match err {
            Error::Config(e) => {
                assert_eq!(e.kind, ConfigErrorKind::Parse);
                assert!(e.source.is_some());
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_shard_type_rejected() {
        let yaml = "schema_list:\n  - user: a\n    shard:\n      - table: t\n        type: modulo\n";
        assert!(ProxyConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ProxyConfig::from_yaml(FULL_YAML).unwrap();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(ProxyConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_save_without_path() {
        let err = ProxyConfig::new().save().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError {
                kind: ConfigErrorKind::NoPath,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_references() {
        let base = ProxyConfig::from_yaml(FULL_YAML).unwrap();

        let mut config = base.clone();
        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.nodes[1].name = "node1".to_string();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.schema_list[0].default = "node3".to_string();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.schema_list[0].nodes.push("node3".to_string());
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.schema_list[0].shard_rules[0].locations.pop();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.schema_list[0].shard_rules[0].kind = ShardType::Range;
        assert!(config.validate().is_err());
        config.schema_list[0].shard_rules[0].table_row_limit = 10_000;
        assert!(config.validate().is_ok());

        let mut config = base;
        config.schema_list[0].shard_rules[1].date_range.clear();
        assert!(config.validate().is_err());
    }
}
