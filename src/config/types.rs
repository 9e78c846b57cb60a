//! Configuration types for tariff interpretation.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files, plus the price tables the
//! reconciliation engine consumes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{DEFAULT_INVESTMENT_RATE, MAX_UNIT_PRICE};
use crate::error::{EngineError, EngineResult};
use crate::models::ServiceCode;

/// Metadata about the tariff agreement.
#[derive(Debug, Clone, Deserialize)]
pub struct TariffMetadata {
    /// Short identifier of the agreement (e.g., "BERLIN-LK").
    pub code: String,
    /// The human-readable name of the agreement.
    pub name: String,
    /// The version of the agreement.
    pub version: String,
    /// The region the agreement applies to.
    pub region: String,
    /// Where the agreement is published.
    pub source_url: String,
}

/// A service code known to the tariff agreement.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    /// The human-readable name of the service.
    pub name: String,
    /// A longer description of what the service comprises.
    #[serde(default)]
    pub description: Option<String>,
}

/// Service catalogue file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    /// Map of service code to service details.
    pub services: BTreeMap<ServiceCode, ServiceDefinition>,
}

/// Prices for a single service code.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRate {
    /// Price per unit.
    pub unit_price: Decimal,
    /// Training levy ("AUB") per unit.
    #[serde(default)]
    pub levy: Decimal,
}

/// Rate configuration for a specific effective date.
#[derive(Debug, Clone, Deserialize)]
pub struct RateConfig {
    /// The effective date for these rates.
    pub effective_date: NaiveDate,
    /// Map of service code to prices.
    pub rates: BTreeMap<ServiceCode, ServiceRate>,
}

impl RateConfig {
    /// Splits the rate file into a unit price table and a levy table.
    pub fn tables(&self) -> (TariffTable, LevyTable) {
        let tariff = self
            .rates
            .iter()
            .map(|(code, rate)| (code.clone(), rate.unit_price))
            .collect();
        let levy = self
            .rates
            .iter()
            .filter(|(_, rate)| rate.levy > Decimal::ZERO)
            .map(|(code, rate)| (code.clone(), rate.levy))
            .collect();
        (tariff, levy)
    }
}

/// A price per unit for each service code.
///
/// Used both for unit prices ([`TariffTable`]) and training levies
/// ([`LevyTable`]).
///
/// # Example
///
/// ```
/// use care_billing::config::TariffTable;
/// use care_billing::models::ServiceCode;
/// use rust_decimal::Decimal;
///
/// let mut table = TariffTable::default();
/// table.insert(ServiceCode::parse("lk02").unwrap(), Decimal::new(961, 2));
/// assert_eq!(table.get(&ServiceCode::parse("LK02").unwrap()), Some(Decimal::new(961, 2)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    prices: BTreeMap<ServiceCode, Decimal>,
}

/// Unit prices per service code.
pub type TariffTable = PriceTable;

/// Training levy per unit per service code.
pub type LevyTable = PriceTable;

impl PriceTable {
    /// Returns the price for `code`, if listed.
    pub fn get(&self, code: &ServiceCode) -> Option<Decimal> {
        self.prices.get(code).copied()
    }

    /// Returns true if `code` is listed.
    pub fn contains(&self, code: &ServiceCode) -> bool {
        self.prices.contains_key(code)
    }

    /// Sets the price for `code`, returning the previous one.
    pub fn insert(&mut self, code: ServiceCode, price: Decimal) -> Option<Decimal> {
        self.prices.insert(code, price)
    }

    /// Number of listed codes.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns true if no code is listed.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Iterates over the listed codes and prices in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&ServiceCode, Decimal)> {
        self.prices.iter().map(|(code, price)| (code, *price))
    }

    /// Rejects negative prices. `table` names the table in the error.
    pub fn validate(&self, table: &str) -> EngineResult<()> {
        for (code, price) in &self.prices {
            if *price < Decimal::ZERO {
                return Err(EngineError::invalid_config(
                    table,
                    format!("negative price {} for {}", price, code),
                ));
            }
            if *price > MAX_UNIT_PRICE {
                return Err(EngineError::invalid_config(
                    table,
                    format!("price {} for {} exceeds {}", price, code, MAX_UNIT_PRICE),
                ));
            }
        }
        Ok(())
    }
}

impl FromIterator<(ServiceCode, Decimal)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (ServiceCode, Decimal)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

/// Reclassifies large warm meals as small meals when the small-meal quota allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealDowngradeRule {
    /// The "large warm meal" code (source of the downgrade).
    pub large_meal: ServiceCode,
    /// The "small meal" code whose ceiling absorbs the large meals.
    pub small_meal: ServiceCode,
}

/// Lets a lower-tier body care code use the unused ceiling of a higher tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareDowngradeRule {
    /// The more intensive code whose ceiling is borrowed.
    pub higher: ServiceCode,
    /// The less intensive code that borrows it.
    pub lower: ServiceCode,
}

/// The cross-code substitution rules applied after the baseline split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRules {
    /// Meal downgrade, applied first.
    #[serde(default)]
    pub meal_downgrade: Option<MealDowngradeRule>,
    /// Care-intensity downgrades, applied in order after the meal downgrade.
    #[serde(default)]
    pub care_downgrades: Vec<CareDowngradeRule>,
}

impl Default for SubstitutionRules {
    /// The Berlin pairs: LK14 → LK15 for meals, LK03 → LK02 and LK04 → LK01 for body care.
    fn default() -> Self {
        let code = ServiceCode::from_static;
        Self {
            meal_downgrade: Some(MealDowngradeRule {
                large_meal: code("LK14"),
                small_meal: code("LK15"),
            }),
            care_downgrades: vec![
                CareDowngradeRule {
                    higher: code("LK03"),
                    lower: code("LK02"),
                },
                CareDowngradeRule {
                    higher: code("LK04"),
                    lower: code("LK01"),
                },
            ],
        }
    }
}

impl SubstitutionRules {
    /// No substitution at all; every code keeps its baseline split.
    pub fn none() -> Self {
        Self {
            meal_downgrade: None,
            care_downgrades: vec![],
        }
    }

    /// Rejects rules that map a code onto itself.
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(meal) = &self.meal_downgrade {
            if meal.large_meal == meal.small_meal {
                return Err(EngineError::invalid_config(
                    "substitutions.meal_downgrade",
                    format!("{} cannot be downgraded to itself", meal.large_meal),
                ));
            }
        }

        for rule in &self.care_downgrades {
            if rule.higher == rule.lower {
                return Err(EngineError::invalid_config(
                    "substitutions.care_downgrades",
                    format!("{} cannot borrow its own ceiling", rule.lower),
                ));
            }
        }

        Ok(())
    }

}

/// Monthly in-kind budgets per care level, effective from a date.
#[derive(Debug, Clone, Deserialize)]
pub struct CareLevelBudgets {
    /// The effective date for these budgets.
    pub effective_date: NaiveDate,
    /// Map of care level ("Pflegegrad") to monthly budget.
    pub budgets: BTreeMap<u8, Decimal>,
}

fn default_investment_rate() -> Decimal {
    DEFAULT_INVESTMENT_RATE
}

/// Rules configuration from rules.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// Investment cost surcharge rate.
    #[serde(default = "default_investment_rate")]
    pub investment_rate: Decimal,
    /// Cross-code substitution rules.
    #[serde(default)]
    pub substitutions: SubstitutionRules,
    /// Insurer budgets by care level.
    #[serde(default)]
    pub care_level_budgets: Vec<CareLevelBudgets>,
}

/// The complete tariff configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct TariffConfig {
    metadata: TariffMetadata,
    services: BTreeMap<ServiceCode, ServiceDefinition>,
    /// Rate configurations by effective date (sorted oldest first).
    rates: Vec<RateConfig>,
    rules: RulesConfig,
}

impl TariffConfig {
    /// Creates a new TariffConfig from its component parts.
    pub fn new(
        metadata: TariffMetadata,
        services: BTreeMap<ServiceCode, ServiceDefinition>,
        rates: Vec<RateConfig>,
        rules: RulesConfig,
    ) -> Self {
        let mut sorted_rates = rates;
        sorted_rates.sort_by(|a, b| a.effective_date.cmp(&b.effective_date));
        let mut rules = rules;
        rules
            .care_level_budgets
            .sort_by(|a, b| a.effective_date.cmp(&b.effective_date));
        Self {
            metadata,
            services,
            rates: sorted_rates,
            rules,
        }
    }

    /// Returns the tariff metadata.
    pub fn metadata(&self) -> &TariffMetadata {
        &self.metadata
    }

    /// Returns the service catalogue.
    pub fn services(&self) -> &BTreeMap<ServiceCode, ServiceDefinition> {
        &self.services
    }

    /// Returns all rate configurations, oldest first.
    pub fn rates(&self) -> &[RateConfig] {
        &self.rates
    }

    /// Returns the rules configuration.
    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }
}
