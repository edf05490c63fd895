use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::model::{AssetClass, Symbol};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Yahoo,
    Coingecko,
    ExchangeRateHost,
    ExchangeRateApi,
    OpenExchangeRates,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Yahoo => "https://query1.finance.yahoo.com",
            ProviderKind::Coingecko => "https://api.coingecko.com",
            ProviderKind::ExchangeRateHost => "https://api.exchangerate.host",
            ProviderKind::ExchangeRateApi => "https://v6.exchangerate-api.com",
            ProviderKind::OpenExchangeRates => "https://openexchangerates.org",
        }
    }

    fn requires_api_key(&self) -> bool {
        matches!(
            self,
            ProviderKind::ExchangeRateApi | ProviderKind::OpenExchangeRates
        )
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Trust weight; non-negative, defaults to 1.0.
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SymbolConfig {
    pub name: String,
    pub class: AssetClass,
}

impl SymbolConfig {
    pub fn to_symbol(&self) -> Symbol {
        Symbol::new(self.name.clone(), self.class)
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlertConfig {
    #[serde(default)]
    pub user: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub upper_threshold: Option<f64>,
    #[serde(default)]
    pub lower_threshold: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_user() -> String {
    "default".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub symbols: Vec<SymbolConfig>,
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub alerts: Vec<AlertConfig>,
    #[serde(default = "default_user")]
    pub default_user: String,
    /// Permit net holdings to go negative.
    #[serde(default)]
    pub allow_short: bool,
    /// Per-provider deadline inside one aggregation.
    #[serde(default = "default_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default)]
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "folio", "folio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "folio", "folio")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Startup validation: malformed weights, endpoints and dangling
    /// alert symbols fail here, not at the first rate query.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for symbol in &self.symbols {
            if symbol.name.is_empty() {
                bail!("Symbol with empty name");
            }
            if !names.insert(symbol.name.as_str()) {
                bail!("Duplicate symbol: {}", symbol.name);
            }
            if symbol.class == AssetClass::Forex && symbol.to_symbol().forex_pair().is_none() {
                bail!(
                    "Forex symbol {} must be a BASE_TARGET pair like USD_EUR",
                    symbol.name
                );
            }
        }

        for provider in &self.providers {
            if !(provider.weight.is_finite() && provider.weight >= 0.0) {
                bail!(
                    "Provider {:?} has invalid weight {}",
                    provider.kind,
                    provider.weight
                );
            }
            let base_url = provider.base_url();
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                bail!("Provider {:?} has invalid endpoint: {base_url}", provider.kind);
            }
            if provider.kind.requires_api_key()
                && provider.api_key.as_deref().unwrap_or("").is_empty()
            {
                bail!("Provider {:?} requires an api_key", provider.kind);
            }
        }

        for alert in &self.alerts {
            if !names.contains(alert.symbol.as_str()) {
                bail!("Alert references unknown symbol: {}", alert.symbol);
            }
            if alert.upper_threshold.is_none() && alert.lower_threshold.is_none() {
                bail!("Alert for {} has no thresholds", alert.symbol);
            }
        }

        Ok(())
    }

    pub fn symbol(&self, name: &str) -> Option<Symbol> {
        self.symbols
            .iter()
            .find(|s| s.name == name)
            .map(SymbolConfig::to_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
symbols:
  - name: "AAPL"
    class: equity
  - name: "bitcoin"
    class: crypto
  - name: "USD_EUR"
    class: forex
providers:
  - kind: yahoo
  - kind: exchange_rate_host
    weight: 0.8
  - kind: exchange_rate_api
    base_url: "http://example.com"
    api_key: "secret"
    weight: 0.9
alerts:
  - symbol: "AAPL"
    upper_threshold: 200.0
    lower_threshold: 100.0
default_user: "demo"
"#;

    #[test]
    fn test_config_deserialization() {
        let config: AppConfig = serde_yaml::from_str(VALID_YAML).expect("Failed to deserialize");
        config.validate().expect("valid config rejected");

        assert_eq!(config.symbols.len(), 3);
        assert_eq!(config.symbols[0].name, "AAPL");
        assert_eq!(config.symbols[0].class, AssetClass::Equity);

        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.providers[0].weight, 1.0);
        assert_eq!(
            config.providers[0].base_url(),
            "https://query1.finance.yahoo.com"
        );
        assert_eq!(config.providers[1].weight, 0.8);
        assert_eq!(config.providers[2].base_url(), "http://example.com");

        assert_eq!(config.default_user, "demo");
        assert!(!config.allow_short);
        assert_eq!(config.provider_timeout_ms, 5000);
    }

    #[test]
    fn test_negative_weight_fails_validation() {
        let yaml = r#"
symbols: []
providers:
  - kind: yahoo
    weight: -1.0
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_endpoint_fails_validation() {
        let yaml = r#"
symbols: []
providers:
  - kind: yahoo
    base_url: "not-a-url"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_api_key_fails_validation() {
        let yaml = r#"
symbols: []
providers:
  - kind: open_exchange_rates
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_forex_pair_fails_validation() {
        let yaml = r#"
symbols:
  - name: "USDEUR"
    class: forex
providers: []
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alert_for_unknown_symbol_fails_validation() {
        let yaml = r#"
symbols: []
providers: []
alerts:
  - symbol: "GHOST"
    upper_threshold: 1.0
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_symbol_lookup() {
        let config: AppConfig = serde_yaml::from_str(VALID_YAML).unwrap();
        let symbol = config.symbol("USD_EUR").unwrap();
        assert_eq!(symbol.asset_class, AssetClass::Forex);
        assert!(config.symbol("GHOST").is_none());
    }
}
