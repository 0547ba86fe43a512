//! Configuration loading for the receipt relay.
//!
//! Configuration comes from an optional file (TOML, JSON or YAML, chosen by
//! extension) in which `${VAR}` references are replaced from the environment,
//! followed by environment overrides:
//!
//! - `BRIDGE_PRIVATE_KEY`: signing key shared by every chain
//! - `{CHAIN}_RPC_URL` / `{CHAIN}_BRIDGE_ADDRESS`: per-chain endpoints, e.g.
//!   `ARBITRUM_RPC_URL`. A chain absent from the file is added when both are set.
//! - `{PREFIX}MAX_ATTEMPTS`, `{PREFIX}POLL_INTERVAL_SECS` with the default
//!   prefix `RELAY_`

use regex::Regex;
use relay_types::{Address, ChainId, KNOWN_CHAINS};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod types;

pub use types::*;

pub const PRIVATE_KEY_ENV: &str = "BRIDGE_PRIVATE_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// File formats understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {:?}",
				path
			))),
		}
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "RELAY_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Loads, overrides and validates using the process environment.
	pub async fn load(&self) -> Result<Config, ConfigError> {
		self.load_with_env(|name| env::var(name).ok()).await
	}

	/// Same as [`Self::load`] with an explicit variable lookup.
	pub async fn load_with_env<F>(&self, lookup: F) -> Result<Config, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = match &self.file_path {
			Some(path) => {
				info!("Loading configuration from {:?}", path);
				if !tokio::fs::try_exists(path).await? {
					return Err(ConfigError::FileNotFound(path.display().to_string()));
				}
				let content = tokio::fs::read_to_string(path).await?;
				let content = substitute_env_vars(&content, &lookup)?;
				parse_config(&content, ConfigFormat::from_path(path)?)?
			}
			None => {
				debug!("No configuration file given, using defaults");
				Config::default()
			}
		};

		self.apply_env_overrides(&mut config, &lookup)?;
		validate_config(&config)?;

		Ok(config)
	}

	fn apply_env_overrides<F>(&self, config: &mut Config, lookup: &F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(key) = lookup(PRIVATE_KEY_ENV) {
			debug!("Overriding private key from environment");
			config.signer.private_key = Some(key);
		}

		for name in KNOWN_CHAINS {
			let chain = ChainId::new(name);
			let prefix = chain.env_prefix();
			let rpc_url = lookup(&format!("{}_RPC_URL", prefix));
			let bridge_address = lookup(&format!("{}_BRIDGE_ADDRESS", prefix));

			if let Some(existing) = config.chains.get_mut(&chain) {
				if let Some(url) = rpc_url {
					debug!("Overriding RPC URL for {} from environment", chain);
					existing.rpc_url = url;
				}
				if let Some(address) = bridge_address {
					debug!("Overriding bridge address for {} from environment", chain);
					existing.bridge_address = address;
				}
				continue;
			}

			match (rpc_url, bridge_address) {
				(Some(rpc_url), Some(bridge_address)) => {
					debug!("Configuring {} from environment", chain);
					config.chains.insert(
						chain,
						ChainConfig {
							rpc_url,
							bridge_address,
						},
					);
				}
				(Some(_), None) | (None, Some(_)) => {
					warn!(
						"Ignoring partial environment configuration for {}: both {}_RPC_URL and {}_BRIDGE_ADDRESS are required",
						chain, prefix, prefix
					);
				}
				(None, None) => {}
			}
		}

		if let Some(value) = lookup(&format!("{}MAX_ATTEMPTS", self.env_prefix)) {
			config.relay.max_attempts = value
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid max attempts: {}", e)))?;
		}

		if let Some(value) = lookup(&format!("{}POLL_INTERVAL_SECS", self.env_prefix)) {
			config.monitor.poll_interval_secs = value.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid poll interval: {}", e))
			})?;
		}

		Ok(())
	}
}

/// Parses configuration text in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
	match format {
		ConfigFormat::Toml => {
			toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
		ConfigFormat::Json => {
			serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
		ConfigFormat::Yaml => {
			serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
	}
}

/// Replaces every `${VAR_NAME}` with the variable's value.
fn substitute_env_vars<F>(content: &str, lookup: &F) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let re = Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(format!("Invalid substitution pattern: {}", e)))?;

	let mut result = content.to_string();
	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let value =
			lookup(var_name).ok_or_else(|| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &value);
	}

	Ok(result)
}

/// Checks the limits and chain settings the relay relies on.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

	if config.relay.max_attempts == 0 {
		return invalid("relay.max_attempts must be at least 1".into());
	}
	if config.relay.backoff_ms.is_empty() {
		return invalid("relay.backoff_ms must contain at least one delay".into());
	}
	if config.relay.relay_timeout_secs == 0 || config.relay.rpc_timeout_secs == 0 {
		return invalid("relay timeouts must be greater than zero".into());
	}
	if config.monitor.poll_interval_secs == 0 {
		return invalid("monitor.poll_interval_secs must be greater than zero".into());
	}

	for (chain, chain_config) in &config.chains {
		if !chain.is_known() {
			return invalid(format!(
				"Unsupported chain '{}' (expected one of {})",
				chain,
				KNOWN_CHAINS.join(", ")
			));
		}
		let url = &chain_config.rpc_url;
		if !(url.starts_with("http://") || url.starts_with("https://")) {
			return invalid(format!(
				"RPC URL for {} must start with http:// or https://",
				chain
			));
		}
		if Address::from_str(&chain_config.bridge_address).is_err() {
			return invalid(format!(
				"Bridge address for {} is not a 20-byte hex address",
				chain
			));
		}
	}

	if let Some(key) = &config.signer.private_key {
		validate_private_key(key).map_err(ConfigError::ValidationError)?;
	}

	Ok(())
}

/// A private key must be 32 bytes of hex, with or without `0x`.
pub fn validate_private_key(key: &str) -> Result<(), String> {
	let key_without_prefix = key.strip_prefix("0x").unwrap_or(key);

	if key_without_prefix.len() != 64 {
		return Err("Private key must be 64 hex characters (32 bytes)".to_string());
	}

	if !key_without_prefix.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err("Private key must be valid hexadecimal".to_string());
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
	const BRIDGE: &str = "0x742d35Cc6634C0532925a3b8D6Ac6c001afb7f9c";

	fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| vars.get(name).cloned()
	}

	fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[tokio::test]
	async fn test_toml_with_substitution() {
		let file = write_config(
			".toml",
			&format!(
				r#"
[relay]
max_attempts = 5
backoff_ms = [10, 20]

[signer]
private_key = "${{BRIDGE_KEY_FILE_VAR}}"

[chains.arbitrum]
rpc_url = "https://arb.example"
bridge_address = "{}"
"#,
				BRIDGE
			),
		);

		let config = ConfigLoader::new()
			.with_file(file.path())
			.load_with_env(env_of(&[("BRIDGE_KEY_FILE_VAR", KEY)]))
			.await
			.unwrap();

		assert_eq!(config.relay.max_attempts, 5);
		assert_eq!(config.relay.backoff_ms, vec![10, 20]);
		assert_eq!(config.relay.rpc_timeout_secs, 15);
		assert_eq!(config.signer.private_key.as_deref(), Some(KEY));
		assert_eq!(
			config.chains[&ChainId::arbitrum()].rpc_url,
			"https://arb.example"
		);
	}

	#[tokio::test]
	async fn test_missing_substitution_variable() {
		let file = write_config(".toml", "[signer]\nprivate_key = \"${NOT_SET_ANYWHERE}\"\n");

		let err = ConfigLoader::new()
			.with_file(file.path())
			.load_with_env(env_of(&[]))
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "NOT_SET_ANYWHERE"));
	}

	#[tokio::test]
	async fn test_chains_from_environment_only() {
		let config = ConfigLoader::new()
			.load_with_env(env_of(&[
				("BRIDGE_PRIVATE_KEY", KEY),
				("OPTIMISM_RPC_URL", "https://op.example"),
				("OPTIMISM_BRIDGE_ADDRESS", BRIDGE),
				// Incomplete, ignored.
				("POLYGON_RPC_URL", "https://polygon.example"),
				("RELAY_POLL_INTERVAL_SECS", "5"),
			]))
			.await
			.unwrap();

		assert_eq!(config.chains.len(), 1);
		assert_eq!(
			config.chains[&ChainId::optimism()],
			ChainConfig {
				rpc_url: "https://op.example".into(),
				bridge_address: BRIDGE.into(),
			}
		);
		assert_eq!(config.monitor.poll_interval_secs, 5);
		assert_eq!(config.signer.private_key.as_deref(), Some(KEY));
	}

	#[tokio::test]
	async fn test_env_overrides_file_values() {
		let file = write_config(
			".json",
			&format!(
				r#"{{"chains": {{"polygon": {{"rpc_url": "https://old.example", "bridge_address": "{}"}}}}}}"#,
				BRIDGE
			),
		);

		let config = ConfigLoader::new()
			.with_file(file.path())
			.with_env_prefix("TEST_")
			.load_with_env(env_of(&[
				("POLYGON_RPC_URL", "https://new.example"),
				("TEST_MAX_ATTEMPTS", "7"),
			]))
			.await
			.unwrap();

		assert_eq!(
			config.chains[&ChainId::polygon()].rpc_url,
			"https://new.example"
		);
		assert_eq!(config.relay.max_attempts, 7);
	}

	#[tokio::test]
	async fn test_missing_file() {
		let err = ConfigLoader::new()
			.with_file("/definitely/not/here.toml")
			.load_with_env(env_of(&[]))
			.await
			.unwrap_err();
		assert!(matches!(err, ConfigError::FileNotFound(_)));
	}

	#[test]
	fn test_yaml_parsing() {
		let config = parse_config(
			"relay:\n  max_attempts: 2\nmonitor:\n  poll_interval_secs: 12\n",
			ConfigFormat::Yaml,
		)
		.unwrap();
		assert_eq!(config.relay.max_attempts, 2);
		assert_eq!(config.monitor.poll_interval_secs, 12);
	}

	#[test]
	fn test_validation_rejects_bad_values() {
		let mut config = Config::default();
		config.relay.max_attempts = 0;
		assert!(validate_config(&config).is_err());

		let mut config = Config::default();
		config.chains.insert(
			ChainId::new("base"),
			ChainConfig {
				rpc_url: "https://base.example".into(),
				bridge_address: BRIDGE.into(),
			},
		);
		assert!(validate_config(&config).is_err());

		let mut config = Config::default();
		config.chains.insert(
			ChainId::arbitrum(),
			ChainConfig {
				rpc_url: "ws://arb.example".into(),
				bridge_address: BRIDGE.into(),
			},
		);
		assert!(validate_config(&config).is_err());

		let mut config = Config::default();
		config.chains.insert(
			ChainId::arbitrum(),
			ChainConfig {
				rpc_url: "https://arb.example".into(),
				bridge_address: "0x1234".into(),
			},
		);
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_private_key_format() {
		assert!(validate_private_key(KEY).is_ok());
		assert!(validate_private_key(&KEY[2..]).is_ok());
		assert!(validate_private_key("0x1234").is_err());
		assert!(validate_private_key(&format!("0x{}", "zz".repeat(32))).is_err());
	}
}
