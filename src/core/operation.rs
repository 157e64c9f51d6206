use super::types::{CalculationRequest, MonteCarloParameters};

pub const MONTE_CARLO_RETURN_STD_DEV: f64 = 0.09;
pub const MONTE_CARLO_INFLATION_STD_DEV: f64 = 0.01;
pub const MONTE_CARLO_CORRELATION: f64 = 0.0;
pub const MONTE_CARLO_TRIALS: u32 = 1_000;
pub const MONTE_CARLO_DISTRIBUTION: &str = "lognormal";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Calculation {
    MaxSpend,
    MaxSpendWithYearlyData,
    TargetSpend,
    MonteCarlo,
}

impl Calculation {
    pub fn endpoint(self) -> &'static str {
        match self {
            Calculation::MaxSpend => "/calculate-max-spend",
            Calculation::MaxSpendWithYearlyData => "/calculate-max-spend-with-yearly-data",
            Calculation::TargetSpend => "/calculate-with-target-spend",
            Calculation::MonteCarlo => "/monte-carlo",
        }
    }

    pub fn needs_target_spend(self) -> bool {
        matches!(self, Calculation::TargetSpend | Calculation::MonteCarlo)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JobQuery {
    Status,
    Result,
}

impl JobQuery {
    pub fn path(self, job_id: &str) -> String {
        match self {
            JobQuery::Status => format!("/simulations/status/{job_id}"),
            JobQuery::Result => format!("/simulations/result/{job_id}"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    Calculate(Calculation),
    Job(JobQuery),
}

impl Operation {
    pub fn from_name(name: &str) -> Option<Self> {
        let operation = match name.trim() {
            "calculateMaxSpend" | "calculate-max-spend" => {
                Operation::Calculate(Calculation::MaxSpend)
            }
            "calculateMaxSpendWithYearlyData" | "calculate-max-spend-with-yearly-data" => {
                Operation::Calculate(Calculation::MaxSpendWithYearlyData)
            }
            "calculateWithTargetSpend" | "calculate-with-target-spend" => {
                Operation::Calculate(Calculation::TargetSpend)
            }
            "monteCarlo" | "monte-carlo" => Operation::Calculate(Calculation::MonteCarlo),
            "getSimulationStatus" | "get-status" => Operation::Job(JobQuery::Status),
            "getSimulationResult" | "get-result" => Operation::Job(JobQuery::Result),
            _ => return None,
        };
        Some(operation)
    }
}

pub fn monte_carlo_parameters() -> MonteCarloParameters {
    MonteCarloParameters {
        return_std_dev: MONTE_CARLO_RETURN_STD_DEV,
        inflation_std_dev: MONTE_CARLO_INFLATION_STD_DEV,
        return_inflation_correlation: MONTE_CARLO_CORRELATION,
        num_trials: MONTE_CARLO_TRIALS,
        distribution: MONTE_CARLO_DISTRIBUTION,
    }
}

/// Applies the per-calculation changes to an assembled request.
///
/// The Monte Carlo endpoint takes returns and inflation as decimal fractions
/// while the synchronous endpoints take percentages, so only that path
/// divides by 100.
pub fn finalize_request(
    mut request: CalculationRequest,
    calculation: Calculation,
    target_monthly_spend: Option<f64>,
) -> CalculationRequest {
    if calculation == Calculation::MonteCarlo {
        request.inputs.expected_returns /= 100.0;
        request.inputs.cpi /= 100.0;
        request.inputs.monte_carlo = Some(monte_carlo_parameters());
    }
    request.target_monthly_spend = if calculation.needs_target_spend() {
        target_monthly_spend
    } else {
        None
    };
    request
}
