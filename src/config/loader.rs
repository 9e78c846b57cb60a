//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading tariff
//! configurations from YAML files.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::calculation::ReconcileConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{ServiceCode, TargetMonth};

use super::types::{
    LevyTable, RateConfig, RulesConfig, ServiceDefinition, ServicesConfig, SubstitutionRules,
    TariffConfig, TariffMetadata, TariffTable,
};

/// Loads and provides access to tariff configuration.
///
/// The `ConfigLoader` reads YAML configuration files from a directory
/// and provides methods to query services, prices, rules and budgets.
///
/// # Directory Structure
///
/// ```text
/// config/berlin_lk/
/// ├── tariff.yaml        # Agreement metadata
/// ├── services.yaml      # Service code catalogue
/// ├── rules.yaml         # Substitution rules, investment rate, care-level budgets
/// └── rates/
///     └── 2025-01-01.yaml  # Unit and levy prices effective from this date
/// ```
///
/// # Example
///
/// ```no_run
/// use care_billing::config::ConfigLoader;
/// use care_billing::models::TargetMonth;
///
/// let loader = ConfigLoader::load("./config/berlin_lk").unwrap();
/// let month = TargetMonth::new(2026, 3).unwrap();
/// let (tariff, levy) = loader.tables_for(month.first_day()).unwrap();
/// println!("{} priced codes, {} with levy", tariff.len(), levy.len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: TariffConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any required file is missing
    /// - Any file contains invalid YAML
    /// - The rates directory holds no rate file
    /// - The rules or prices are invalid (negative prices, self-referencing rules)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let metadata = Self::load_yaml::<TariffMetadata>(&path.join("tariff.yaml"))?;
        let services = Self::load_yaml::<ServicesConfig>(&path.join("services.yaml"))?;
        let rules = Self::load_yaml::<RulesConfig>(&path.join("rules.yaml"))?;
        let rates = Self::load_rates(&path.join("rates"))?;

        if rules.investment_rate < Decimal::ZERO {
            return Err(EngineError::invalid_config(
                "investment_rate",
                "must not be negative",
            ));
        }
        rules.substitutions.validate()?;
        for rate_config in &rates {
            let (tariff, levy) = rate_config.tables();
            let label = format!("rates/{}", rate_config.effective_date);
            tariff.validate(&label)?;
            levy.validate(&label)?;
        }

        debug!(
            tariff = %metadata.code,
            services = services.services.len(),
            rate_files = rates.len(),
            "Loaded tariff configuration"
        );

        let config = TariffConfig::new(metadata, services.services, rates, rules);
        Ok(Self { config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all rate files from the rates directory.
    fn load_rates(rates_dir: &Path) -> EngineResult<Vec<RateConfig>> {
        let rates_dir_str = rates_dir.display().to_string();

        let entries = fs::read_dir(rates_dir).map_err(|_| EngineError::ConfigNotFound {
            path: rates_dir_str.clone(),
        })?;

        let mut rates = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: rates_dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                rates.push(Self::load_yaml::<RateConfig>(&path)?);
            }
        }

        if rates.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no rate files found)", rates_dir_str),
            });
        }

        Ok(rates)
    }

    /// Returns the underlying tariff configuration.
    pub fn config(&self) -> &TariffConfig {
        &self.config
    }

    /// Returns the tariff metadata.
    pub fn metadata(&self) -> &TariffMetadata {
        self.config.metadata()
    }

    /// Gets a service definition by its code.
    pub fn get_service(&self, code: &ServiceCode) -> Option<&ServiceDefinition> {
        self.config.services().get(code)
    }

    /// Returns the most recent rate configuration effective on or before `date`.
    pub fn rates_for(&self, date: NaiveDate) -> EngineResult<&RateConfig> {
        self.config
            .rates()
            .iter()
            .rfind(|rc| rc.effective_date <= date)
            .ok_or(EngineError::TariffNotFound { date })
    }

    /// Returns the unit price and levy tables effective on `date`.
    pub fn tables_for(&self, date: NaiveDate) -> EngineResult<(TariffTable, LevyTable)> {
        Ok(self.rates_for(date)?.tables())
    }

    /// Returns the configured investment cost rate.
    pub fn investment_rate(&self) -> Decimal {
        self.config.rules().investment_rate
    }

    /// Returns the configured substitution rules.
    pub fn substitution_rules(&self) -> &SubstitutionRules {
        &self.config.rules().substitutions
    }

    /// Gets the monthly insurer budget for a care level on a given date.
    pub fn insurer_budget(&self, care_level: u8, date: NaiveDate) -> EngineResult<Decimal> {
        self.config
            .rules()
            .care_level_budgets
            .iter()
            .rfind(|b| b.effective_date <= date)
            .and_then(|b| b.budgets.get(&care_level).copied())
            .ok_or(EngineError::CareLevelNotFound { care_level, date })
    }

    /// Builds the engine configuration for one billing month.
    ///
    /// Picks the tables effective on the first day of `month`; an explicit
    /// `investment_rate` overrides the configured one. The service catalogue
    /// is carried along so unpriced catalogued codes are not reported unknown.
    pub fn reconcile_config(
        &self,
        month: TargetMonth,
        insurer_budget: Decimal,
        investment_rate: Option<Decimal>,
    ) -> EngineResult<ReconcileConfig> {
        let (tariff, levy) = self.tables_for(month.first_day())?;
        Ok(ReconcileConfig {
            tariff,
            levy,
            investment_rate: Some(investment_rate.unwrap_or(self.investment_rate())),
            insurer_budget,
            target_month: Some(month),
            rules: self.substitution_rules().clone(),
            catalogue: self.config.services().keys().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/berlin_lk"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn code(s: &str) -> ServiceCode {
        ServiceCode::parse(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.metadata().code, "BERLIN-LK");
        assert_eq!(loader.metadata().region, "Berlin");
    }

    #[test]
    fn test_get_service() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let service = loader.get_service(&code("lk14")).unwrap();
        assert_eq!(service.name, "Zubereitung einer warmen Mahlzeit");
        assert!(loader.get_service(&code("LK99")).is_none());
    }

    #[test]
    fn test_rates_follow_effective_date() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let (tariff_2025, _) = loader.tables_for(date(2025, 6, 1)).unwrap();
        let (tariff_2026, levy_2026) = loader.tables_for(date(2026, 3, 1)).unwrap();

        assert_eq!(tariff_2025.get(&code("LK02")), Some(dec("9.28")));
        assert_eq!(tariff_2026.get(&code("LK02")), Some(dec("9.61")));
        assert_eq!(levy_2026.get(&code("LK02")), Some(dec("0.21")));
    }

    #[test]
    fn test_tariff_not_found_for_early_date() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        match loader.tables_for(date(2020, 1, 1)) {
            Err(EngineError::TariffNotFound { date: d }) => assert_eq!(d, date(2020, 1, 1)),
            other => panic!("Expected TariffNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_investment_rate_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        assert_eq!(loader.investment_rate(), dec("0.0338"));
    }

    #[test]
    fn test_substitution_rules_loaded() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        assert_eq!(loader.substitution_rules(), &SubstitutionRules::default());
    }

    #[test]
    fn test_insurer_budget_by_care_level() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        assert_eq!(
            loader.insurer_budget(3, date(2025, 3, 1)).unwrap(),
            dec("1497.00")
        );
        assert_eq!(
            loader.insurer_budget(3, date(2026, 3, 1)).unwrap(),
            dec("1497.00")
        );
        assert!(matches!(
            loader.insurer_budget(1, date(2026, 3, 1)),
            Err(EngineError::CareLevelNotFound { care_level: 1, .. })
        ));
    }

    #[test]
    fn test_reconcile_config_uses_month_tables() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let month = TargetMonth::new(2026, 3).unwrap();

        let config = loader
            .reconcile_config(month, dec("1497.00"), None)
            .unwrap();

        assert_eq!(config.target_month, Some(month));
        assert_eq!(config.investment_rate, Some(dec("0.0338")));
        assert_eq!(config.tariff.get(&code("LK14")), Some(dec("21.35")));
        assert!(config.catalogue.contains(&code("LK14")));
        assert!(!config.catalogue.contains(&code("LK99")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reconcile_config_rate_override() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let month = TargetMonth::new(2026, 3).unwrap();

        let config = loader
            .reconcile_config(month, dec("0"), Some(dec("0.05")))
            .unwrap();

        assert_eq!(config.investment_rate, Some(dec("0.05")));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("tariff.yaml"));
            }
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }
}
