use serde_json::{Value, json};
use tracing::{Instrument, info, info_span, warn};

use crate::client::{JobResolver, ResolverConfig, Transport};
use crate::core::{
    Bag, Calculation, CalculationRequest, Operation, Row, ScenarioInputs, assemble_request,
    finalize_request,
};
use crate::error::ConnectorError;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ErrorMode {
    #[default]
    Abort,
    Continue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectorConfig {
    pub error_mode: ErrorMode,
    pub resolver: ResolverConfig,
}

pub fn row_operation(row: &Row<'_>) -> Result<Operation, ConnectorError> {
    match row
        .optional::<String>("operation")?
        .filter(|name| !name.is_empty())
    {
        None => Ok(Operation::Calculate(Calculation::MaxSpend)),
        Some(name) => Operation::from_name(&name).ok_or(ConnectorError::UnknownOperation {
            row: row.index,
            operation: name,
        }),
    }
}

pub fn prepare_request(
    row: &Row<'_>,
    calculation: Calculation,
) -> Result<CalculationRequest, ConnectorError> {
    let inputs = ScenarioInputs::from_row(row)?;
    let target_monthly_spend = if calculation.needs_target_spend() {
        Some(row.required::<f64>("targetMonthlySpend")?)
    } else {
        None
    };
    Ok(finalize_request(
        assemble_request(row, &inputs),
        calculation,
        target_monthly_spend,
    ))
}

pub struct Connector<T> {
    transport: T,
    config: ConnectorConfig,
}

impl<T: Transport> Connector<T> {
    pub fn new(transport: T, config: ConnectorConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> ConnectorConfig {
        self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn execute_row(&self, index: usize, params: &Bag) -> Result<Value, ConnectorError> {
        let row = Row::new(index, params);
        match row_operation(&row)? {
            Operation::Calculate(calculation) => {
                let request = prepare_request(&row, calculation)?;
                let body = serde_json::to_value(&request)?;
                self.transport
                    .post_json(calculation.endpoint(), body)
                    .await
                    .map_err(|e| e.at_row(index))
            }
            Operation::Job(query) => {
                let job_id = row.required::<String>("taskId")?;
                if job_id.is_empty() {
                    return Err(ConnectorError::MissingParameter {
                        row: index,
                        name: "taskId".to_string(),
                    });
                }
                JobResolver::new(&self.transport, self.config.resolver)
                    .resolve(&job_id, query)
                    .await
                    .map_err(|e| e.at_row(index))
            }
        }
    }

    pub async fn execute(&self, rows: &[Bag]) -> Result<Vec<Value>, ConnectorError> {
        self.execute_with_mode(rows, self.config.error_mode).await
    }

    /// In [`ErrorMode::Continue`] a failing row yields `{ "error": message }`.
    pub async fn execute_with_mode(
        &self,
        rows: &[Bag],
        mode: ErrorMode,
    ) -> Result<Vec<Value>, ConnectorError> {
        let mut outputs = Vec::with_capacity(rows.len());
        for (index, params) in rows.iter().enumerate() {
            let span = info_span!("row", index);
            match self.execute_row(index, params).instrument(span).await {
                Ok(response) => {
                    info!(row = index, "row complete");
                    outputs.push(response);
                }
                Err(err) if mode == ErrorMode::Continue => {
                    warn!(row = index, error = %err, "row failed; continuing");
                    outputs.push(json!({ "error": err.to_string() }));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outputs)
    }
}
