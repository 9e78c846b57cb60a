//! Configuration loading and management for the Care Billing engine.
//!
//! This module provides functionality to load tariff configurations from YAML
//! files, including agreement metadata, the service catalogue, dated price
//! tables, substitution rules and care-level budgets.
//!
//! # Example
//!
//! ```no_run
//! use care_billing::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/berlin_lk").unwrap();
//! println!("Loaded tariff: {}", config.metadata().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    CareDowngradeRule, CareLevelBudgets, LevyTable, MealDowngradeRule, PriceTable, RateConfig,
    RulesConfig, ServiceDefinition, ServiceRate, ServicesConfig, SubstitutionRules, TariffConfig,
    TariffMetadata, TariffTable,
};
