use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    Rrsp,
    Tfsa,
    NonRegistered,
}

impl Account {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "rrsp" | "rrif" => Some(Account::Rrsp),
            "tfsa" => Some(Account::Tfsa),
            "non_registered" | "nonregistered" | "non_reg" | "taxable" => {
                Some(Account::NonRegistered)
            }
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScenarioMode {
    Individual,
    Couple,
}

impl ScenarioMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "individual" | "single" => Some(ScenarioMode::Individual),
            "couple" => Some(ScenarioMode::Couple),
            _ => None,
        }
    }
}

/// How a defined-benefit pension is indexed in a phase of life.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indexation {
    None,
    Cpi,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonProfile {
    pub name: String,
    pub current_age: u32,
    pub retirement_age: u32,
    pub death_age: u32,
    pub rrsp: f64,
    pub tfsa: f64,
    pub non_registered: f64,
    pub lira: f64,
    pub cost_basis: f64,
    pub rrsp_room: f64,
    pub tfsa_room: f64,
    pub cpp_start_age: u32,
    pub oas_start_age: u32,
    pub base_cpp_amount: f64,
    pub base_oas_amount: f64,
    pub db_enabled: bool,
    pub db_pension_income: f64,
    pub db_start_age: u32,
    pub db_index_before_retirement: Indexation,
    pub db_index_after_retirement: Indexation,
    pub db_survivor_benefit_percent: f64,
    pub db_cpp_clawback_fraction: f64,
    pub db_guarantee_period: bool,
    pub non_reg_growth_percent: f64,
    pub non_reg_dividend_yield: f64,
    pub non_reg_eligible_dividend_percent: f64,
    pub rrif_conversion_age: u32,
    pub lif_conversion_age: u32,
    pub meltdown_strategy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WithdrawalDirective {
    Weighted { account: Account, weight_pct: f64 },
    Fallback(FallbackDirective),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackDirective {
    #[serde(rename = "type")]
    pub kind: FallbackTag,
    pub order: [Account; 3],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackTag {
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalPolicy {
    pub weights: Vec<WithdrawalDirective>,
}

impl WithdrawalPolicy {
    pub fn fallback_order(&self) -> Option<[Account; 3]> {
        match self.weights.last() {
            Some(WithdrawalDirective::Fallback(fallback)) => Some(fallback.order),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalStrategies {
    pub person1: WithdrawalPolicy,
    pub person2: WithdrawalPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloParameters {
    pub return_std_dev: f64,
    pub inflation_std_dev: f64,
    pub return_inflation_correlation: f64,
    pub num_trials: u32,
    pub distribution: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalAssumptions {
    pub expected_returns: f64,
    pub cpi: f64,
    pub province: String,
    pub individual: bool,
    pub income_split: bool,
    pub allocation: f64,
    pub survivor_expense_percent: f64,
    pub base_tfsa_amount: f64,
    pub calculate_gis: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<MonteCarloParameters>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationRequest {
    #[serde(rename = "person1_ui")]
    pub person1: PersonProfile,
    #[serde(rename = "person2_ui")]
    pub person2: PersonProfile,
    pub inputs: GlobalAssumptions,
    pub withdrawal_strategy: WithdrawalStrategies,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_monthly_spend: Option<f64>,
}
