use super::params::{Row, cascade};
use super::person::{
    PersonInputs, PersonOverrides, PersonSlot, normalize_person, phantom_person,
};
use super::types::{CalculationRequest, GlobalAssumptions, ScenarioMode, WithdrawalStrategies};
use super::withdrawal::{WithdrawalPreferences, build_withdrawal_policy};
use crate::error::ConnectorError;

pub const DEFAULT_EXPECTED_RETURNS: f64 = 6.0;
pub const DEFAULT_CPI: f64 = 3.0;
pub const DEFAULT_PROVINCE: &str = "ON";
pub const DEFAULT_ALLOCATION_PERCENT: f64 = 50.0;
pub const DEFAULT_SURVIVOR_EXPENSE_PERCENT: f64 = 100.0;
pub const DEFAULT_BASE_TFSA_AMOUNT: f64 = 7_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioInputs {
    pub mode: ScenarioMode,
    pub person1: PersonInputs,
    pub person2: Option<PersonInputs>,
    pub expected_returns: f64,
    pub cpi: f64,
    pub province: String,
}

impl ScenarioInputs {
    pub fn from_row(row: &Row<'_>) -> Result<Self, ConnectorError> {
        let scenario_type = row
            .optional::<String>("scenarioType")?
            .filter(|name| !name.is_empty());
        let mode = match scenario_type {
            None => ScenarioMode::Individual,
            Some(name) => {
                ScenarioMode::from_name(&name).ok_or_else(|| ConnectorError::InvalidParameter {
                    row: row.index,
                    name: "scenarioType".to_string(),
                    reason: format!("expected `individual` or `couple`, got `{name}`"),
                })?
            }
        };

        let person1 = PersonInputs::from_row(row, PersonSlot::One)?;
        let person2 = match mode {
            ScenarioMode::Couple => Some(PersonInputs::from_row(row, PersonSlot::Two)?),
            ScenarioMode::Individual => None,
        };

        Ok(Self {
            mode,
            person1,
            person2,
            expected_returns: row
                .optional("expectedReturns")?
                .unwrap_or(DEFAULT_EXPECTED_RETURNS),
            cpi: row.optional("cpi")?.unwrap_or(DEFAULT_CPI),
            province: row
                .optional::<String>("province")?
                .filter(|code| !code.is_empty())
                .unwrap_or_else(|| DEFAULT_PROVINCE.to_string()),
        })
    }
}

pub fn assemble_request(row: &Row<'_>, inputs: &ScenarioInputs) -> CalculationRequest {
    let person1 = normalize_person(
        &inputs.person1,
        PersonSlot::One,
        PersonOverrides::from_row(row, PersonSlot::One),
    );
    let person2 = match (inputs.mode, &inputs.person2) {
        (ScenarioMode::Couple, Some(person2)) => normalize_person(
            person2,
            PersonSlot::Two,
            PersonOverrides::from_row(row, PersonSlot::Two),
        ),
        _ => phantom_person(),
    };

    let global = row.bag("globalSettings");
    let assumptions = GlobalAssumptions {
        expected_returns: inputs.expected_returns,
        cpi: inputs.cpi,
        province: inputs.province.clone(),
        individual: inputs.mode == ScenarioMode::Individual,
        income_split: cascade(&[(global, "incomeSplit")], false),
        allocation: cascade(&[(global, "allocation")], DEFAULT_ALLOCATION_PERCENT),
        survivor_expense_percent: cascade(
            &[(global, "survivorExpensePercent")],
            DEFAULT_SURVIVOR_EXPENSE_PERCENT,
        ),
        base_tfsa_amount: cascade(&[(global, "baseTfsa")], DEFAULT_BASE_TFSA_AMOUNT),
        calculate_gis: cascade(&[(global, "calculateGis")], false),
        monte_carlo: None,
    };

    let strategy_for = |slot: PersonSlot| {
        let bag = match (inputs.mode, slot) {
            (ScenarioMode::Individual, PersonSlot::Two) => None,
            _ => row.bag(&slot.key("WithdrawalStrategy")),
        };
        build_withdrawal_policy(&WithdrawalPreferences::from_bag(bag))
    };

    CalculationRequest {
        person1,
        person2,
        inputs: assumptions,
        withdrawal_strategy: WithdrawalStrategies {
            person1: strategy_for(PersonSlot::One),
            person2: strategy_for(PersonSlot::Two),
        },
        target_monthly_spend: None,
    }
}
