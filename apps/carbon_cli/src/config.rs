use std::{fs, io::ErrorKind, path::Path, time::Duration};

use anyhow::{bail, Context};
use rpc_wallet::RpcWalletConfig;
use serde::Deserialize;
use shared::domain::Address;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub rpc_url: String,
    pub contract_address: Option<String>,
    pub receipt_poll_ms: u64,
    pub watch_poll_ms: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".into(),
            contract_address: None,
            receipt_poll_ms: 1000,
            watch_poll_ms: 2000,
            log_filter: "info".into(),
        }
    }
}

/// Keys accepted in `carbon.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    rpc_url: Option<String>,
    contract_address: Option<String>,
    receipt_poll_ms: Option<u64>,
    watch_poll_ms: Option<u64>,
    log_filter: Option<String>,
}

/// Settings after validation, ready to build the wallet and the client.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub wallet: RpcWalletConfig,
    pub contract: Address,
}

impl Settings {
    pub fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file: FileSettings = toml::from_str(raw).context("invalid config file")?;
        if let Some(v) = file.rpc_url {
            self.rpc_url = v;
        }
        if let Some(v) = file.contract_address {
            self.contract_address = Some(v);
        }
        if let Some(v) = file.receipt_poll_ms {
            self.receipt_poll_ms = v;
        }
        if let Some(v) = file.watch_poll_ms {
            self.watch_poll_ms = v;
        }
        if let Some(v) = file.log_filter {
            self.log_filter = v;
        }
        Ok(())
    }

    /// Later names win, so `APP__*` overrides the short `CARBON_*` form.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["CARBON_RPC_URL", "APP__RPC_URL"] {
            if let Some(v) = lookup(key) {
                self.rpc_url = v;
            }
        }
        for key in ["CARBON_CONTRACT_ADDRESS", "APP__CONTRACT_ADDRESS"] {
            if let Some(v) = lookup(key) {
                self.contract_address = Some(v);
            }
        }
        if let Some(v) = lookup("APP__RECEIPT_POLL_MS").and_then(|v| v.parse().ok()) {
            self.receipt_poll_ms = v;
        }
        if let Some(v) = lookup("APP__WATCH_POLL_MS").and_then(|v| v.parse().ok()) {
            self.watch_poll_ms = v;
        }
        if let Some(v) = lookup("RUST_LOG") {
            self.log_filter = v;
        }
    }

    pub fn resolve(&self) -> anyhow::Result<ResolvedSettings> {
        let endpoint = Url::parse(self.rpc_url.trim())
            .with_context(|| format!("invalid rpc url '{}'", self.rpc_url))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!("rpc url '{endpoint}' must use http or https");
        }

        let Some(raw_contract) = self.contract_address.as_deref() else {
            bail!("no contract address configured; set CARBON_CONTRACT_ADDRESS or pass --contract");
        };
        let contract = Address::parse(raw_contract)
            .with_context(|| format!("invalid contract address '{raw_contract}'"))?;

        if self.receipt_poll_ms == 0 || self.watch_poll_ms == 0 {
            bail!("poll intervals must be greater than zero");
        }

        Ok(ResolvedSettings {
            wallet: RpcWalletConfig {
                endpoint,
                receipt_poll: Duration::from_millis(self.receipt_poll_ms),
                watch_poll: Duration::from_millis(self.watch_poll_ms),
            },
            contract,
        })
    }
}

/// Defaults, then the config file if it exists, then the environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => settings
            .apply_file(&raw)
            .with_context(|| format!("failed to load '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
    }

    settings.apply_env_with(|key| std::env::var(key).ok());
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
