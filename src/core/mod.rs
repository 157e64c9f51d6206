mod operation;
mod params;
mod person;
mod scenario;
mod types;
mod withdrawal;

pub use operation::{
    Calculation, JobQuery, MONTE_CARLO_TRIALS, Operation, finalize_request,
    monte_carlo_parameters,
};
pub use params::{Bag, ParamValue, Row, cascade, first_set};
pub use person::{
    OAS_BASELINE_AMOUNT, PersonInputs, PersonOverrides, PersonSlot, default_cost_basis,
    normalize_person, phantom_person,
};
pub use scenario::{ScenarioInputs, assemble_request};
pub use types::{
    Account, CalculationRequest, FallbackDirective, FallbackTag, GlobalAssumptions, Indexation,
    MonteCarloParameters, PersonProfile, ScenarioMode, WithdrawalDirective, WithdrawalPolicy,
    WithdrawalStrategies,
};
pub use withdrawal::{
    AccountWeights, DEFAULT_FALLBACK_ORDER, WithdrawalPreferences, build_withdrawal_policy,
    resolve_fallback_order,
};
