use serde_json::Value;

use super::params::{Bag, ParamValue, Row, cascade, first_set};
use super::types::{Indexation, PersonProfile};
use crate::error::ConnectorError;

pub const DEFAULT_CURRENT_AGE: u32 = 55;
pub const DEFAULT_RETIREMENT_AGE: u32 = 65;
pub const DEFAULT_DEATH_AGE: u32 = 90;
pub const DEFAULT_BENEFIT_START_AGE: u32 = 65;
pub const DEFAULT_BASE_CPP_AMOUNT: f64 = 12_000.0;
pub const OAS_BASELINE_AMOUNT: f64 = 8_800.0;
pub const DEFAULT_CONVERSION_AGE: u32 = 71;
pub const DEFAULT_GROWTH_SHARE_PERCENT: f64 = 90.0;
pub const DEFAULT_DIVIDEND_YIELD_PERCENT: f64 = 2.0;
pub const DEFAULT_ELIGIBLE_DIVIDEND_PERCENT: f64 = 70.0;
pub const DEFAULT_DB_START_AGE: u32 = 65;
pub const DEFAULT_DB_SURVIVOR_PERCENT: f64 = 60.0;

impl ParamValue for Indexation {
    fn parse(value: &Value) -> Result<Self, String> {
        if let Value::Bool(indexed) = value {
            return Ok(if *indexed { Indexation::Cpi } else { Indexation::None });
        }
        match <String as ParamValue>::parse(value)?.to_ascii_lowercase().as_str() {
            "none" | "flat" => Ok(Indexation::None),
            "cpi" | "indexed" => Ok(Indexation::Cpi),
            other => Err(format!("unknown indexation `{other}`")),
        }
    }

    fn is_unset(&self) -> bool {
        false
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PersonSlot {
    One,
    Two,
}

impl PersonSlot {
    fn number(self) -> u8 {
        match self {
            PersonSlot::One => 1,
            PersonSlot::Two => 2,
        }
    }

    pub fn key(self, suffix: &str) -> String {
        format!("p{}{suffix}", self.number())
    }

    pub fn default_name(self) -> String {
        format!("Person {}", self.number())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonInputs {
    pub name: Option<String>,
    pub current_age: u32,
    pub retirement_age: u32,
    pub death_age: u32,
    pub rrsp: f64,
    pub tfsa: f64,
    pub non_registered: f64,
    pub explicit_cost_basis: Option<f64>,
}

impl PersonInputs {
    pub fn from_row(row: &Row<'_>, slot: PersonSlot) -> Result<Self, ConnectorError> {
        let rrsp_key = slot.key("Rrsp");
        let tfsa_key = slot.key("Tfsa");
        let non_registered_key = slot.key("NonRegistered");
        Ok(Self {
            name: row.optional(&slot.key("Name"))?,
            current_age: row.required(&slot.key("CurrentAge"))?,
            retirement_age: row.required(&slot.key("RetirementAge"))?,
            death_age: row.required(&slot.key("DeathAge"))?,
            rrsp: non_negative(row, &rrsp_key, row.required(&rrsp_key)?)?,
            tfsa: non_negative(row, &tfsa_key, row.required(&tfsa_key)?)?,
            non_registered: non_negative(
                row,
                &non_registered_key,
                row.optional(&non_registered_key)?.unwrap_or(0.0),
            )?,
            explicit_cost_basis: row.optional(&slot.key("NonRegAcb"))?,
        })
    }
}

fn non_negative(row: &Row<'_>, key: &str, balance: f64) -> Result<f64, ConnectorError> {
    if balance < 0.0 {
        return Err(ConnectorError::InvalidParameter {
            row: row.index,
            name: key.to_string(),
            reason: format!("balance must not be negative, got {balance}"),
        });
    }
    Ok(balance)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PersonOverrides<'a> {
    pub advanced: Option<&'a Bag>,
    pub db_pension: Option<&'a Bag>,
    pub global: Option<&'a Bag>,
}

impl<'a> PersonOverrides<'a> {
    pub fn from_row(row: &Row<'a>, slot: PersonSlot) -> Self {
        Self {
            advanced: row.bag(&slot.key("AdvancedOptions")),
            db_pension: row.bag(&slot.key("DbPension")),
            global: row.bag("globalSettings"),
        }
    }

    fn personal<T: ParamValue>(&self, key: &str, fallback: T) -> T {
        cascade(&[(self.advanced, key)], fallback)
    }

    fn shared<T: ParamValue>(&self, key: &str, fallback: T) -> T {
        cascade(&[(self.advanced, key), (self.global, key)], fallback)
    }

    fn pension<T: ParamValue>(&self, key: &str, fallback: T) -> T {
        cascade(&[(self.db_pension, key)], fallback)
    }
}

pub fn default_cost_basis(non_registered: f64, growth_share_percent: f64) -> f64 {
    if non_registered == 0.0 {
        return 0.0;
    }
    non_registered * (growth_share_percent / 100.0)
}

pub fn normalize_person(
    inputs: &PersonInputs,
    slot: PersonSlot,
    overrides: PersonOverrides<'_>,
) -> PersonProfile {
    let growth_share = overrides.shared("nonRegGrowthPercent", DEFAULT_GROWTH_SHARE_PERCENT);
    let explicit_basis = inputs
        .explicit_cost_basis
        .filter(|v| !v.is_unset())
        .or_else(|| first_set(&[(overrides.advanced, "costBasis")]));
    let cost_basis = explicit_basis
        .unwrap_or_else(|| default_cost_basis(inputs.non_registered, growth_share));

    let db_enabled = overrides.pension("enabled", false);

    PersonProfile {
        name: inputs
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| slot.default_name()),
        current_age: inputs.current_age,
        retirement_age: inputs.retirement_age,
        death_age: inputs.death_age,
        rrsp: inputs.rrsp,
        tfsa: inputs.tfsa,
        non_registered: inputs.non_registered,
        lira: overrides.personal("lira", 0.0),
        cost_basis,
        rrsp_room: overrides.personal("rrspRoom", 0.0),
        tfsa_room: overrides.personal("tfsaRoom", 0.0),
        cpp_start_age: overrides.shared("cppStartAge", DEFAULT_BENEFIT_START_AGE),
        oas_start_age: overrides.shared("oasStartAge", DEFAULT_BENEFIT_START_AGE),
        base_cpp_amount: overrides.personal("baseCppAmount", DEFAULT_BASE_CPP_AMOUNT),
        base_oas_amount: overrides.personal("baseOasAmount", OAS_BASELINE_AMOUNT),
        db_enabled,
        db_pension_income: if db_enabled {
            overrides.pension("income", 0.0)
        } else {
            0.0
        },
        db_start_age: overrides.pension("startAge", DEFAULT_DB_START_AGE),
        db_index_before_retirement: overrides.pension("indexBeforeRetirement", Indexation::None),
        db_index_after_retirement: overrides.pension("indexAfterRetirement", Indexation::Cpi),
        db_survivor_benefit_percent: overrides
            .pension("survivorPercent", DEFAULT_DB_SURVIVOR_PERCENT),
        db_cpp_clawback_fraction: overrides.pension("cppClawbackFraction", 0.0),
        db_guarantee_period: overrides.pension("guaranteePeriod", false),
        non_reg_growth_percent: growth_share,
        non_reg_dividend_yield: overrides
            .shared("nonRegDividendYield", DEFAULT_DIVIDEND_YIELD_PERCENT),
        non_reg_eligible_dividend_percent: overrides
            .shared("nonRegEligibleDividendPercent", DEFAULT_ELIGIBLE_DIVIDEND_PERCENT),
        rrif_conversion_age: overrides.shared("rrifAge", DEFAULT_CONVERSION_AGE),
        lif_conversion_age: overrides.shared("lifAge", DEFAULT_CONVERSION_AGE),
        meltdown_strategy: overrides.personal("meltdownStrategy", false),
    }
}

/// Stand-in second person for individual scenarios: default ages, no money,
/// OAS baseline only, no DB pension.
pub fn phantom_person() -> PersonProfile {
    PersonProfile {
        name: PersonSlot::Two.default_name(),
        current_age: DEFAULT_CURRENT_AGE,
        retirement_age: DEFAULT_RETIREMENT_AGE,
        death_age: DEFAULT_DEATH_AGE,
        rrsp: 0.0,
        tfsa: 0.0,
        non_registered: 0.0,
        lira: 0.0,
        cost_basis: 0.0,
        rrsp_room: 0.0,
        tfsa_room: 0.0,
        cpp_start_age: DEFAULT_BENEFIT_START_AGE,
        oas_start_age: DEFAULT_BENEFIT_START_AGE,
        base_cpp_amount: 0.0,
        base_oas_amount: OAS_BASELINE_AMOUNT,
        db_enabled: false,
        db_pension_income: 0.0,
        db_start_age: DEFAULT_DB_START_AGE,
        db_index_before_retirement: Indexation::None,
        db_index_after_retirement: Indexation::Cpi,
        db_survivor_benefit_percent: DEFAULT_DB_SURVIVOR_PERCENT,
        db_cpp_clawback_fraction: 0.0,
        db_guarantee_period: false,
        non_reg_growth_percent: DEFAULT_GROWTH_SHARE_PERCENT,
        non_reg_dividend_yield: DEFAULT_DIVIDEND_YIELD_PERCENT,
        non_reg_eligible_dividend_percent: DEFAULT_ELIGIBLE_DIVIDEND_PERCENT,
        rrif_conversion_age: DEFAULT_CONVERSION_AGE,
        lif_conversion_age: DEFAULT_CONVERSION_AGE,
        meltdown_strategy: false,
    }
}
