use serde_json::Value;
use tracing::{debug, info, warn};

use super::Transport;
use crate::core::JobQuery;
use crate::error::ConnectorError;

/// Result status marking a job the service re-dispatched under another id.
pub const HANDOVER_STATUS: &str = "ORCHESTRATED";
pub const SUB_TASK_FIELD: &str = "sub_task_id";
pub const ORIGINAL_TASK_FIELD: &str = "original_task_id";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JobStatus {
    Pending,
    Success,
    Failure,
    Other,
}

impl JobStatus {
    pub fn of(response: &Value) -> Self {
        match response.get("status").and_then(Value::as_str) {
            Some(s) if s.eq_ignore_ascii_case("PENDING") => JobStatus::Pending,
            Some(s) if s.eq_ignore_ascii_case("SUCCESS") => JobStatus::Success,
            Some(s) if s.eq_ignore_ascii_case("FAILURE") => JobStatus::Failure,
            _ => JobStatus::Other,
        }
    }
}

/// The id a result hands over to, if it carries the hand-over signature.
///
/// The signature is looked up in the `result` object when there is one,
/// otherwise in the response itself.
pub fn handover_target(result: &Value) -> Option<String> {
    let payload = match result.get("result") {
        Some(inner @ Value::Object(_)) => inner,
        _ => result,
    };
    let status = payload.get("status")?.as_str()?;
    if !status.eq_ignore_ascii_case(HANDOVER_STATUS) {
        return None;
    }
    payload
        .get(SUB_TASK_FIELD)?
        .as_str()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// How many hand-overs are followed. At the last followed level the
    /// sub-job is read directly and never re-checked.
    pub max_handover_depth: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_handover_depth: 1,
        }
    }
}

#[derive(Debug)]
enum ResolveState {
    QueryingStatus,
    QueryingResult { status: Value },
    FollowingSubjob { sub_job_id: String },
    Done(Value),
}

pub struct JobResolver<'a, T> {
    transport: &'a T,
    config: ResolverConfig,
}

impl<'a, T: Transport> JobResolver<'a, T> {
    pub fn new(transport: &'a T, config: ResolverConfig) -> Self {
        Self { transport, config }
    }

    /// A status other than SUCCESS is returned verbatim without reading the
    /// result.
    pub async fn resolve(&self, job_id: &str, query: JobQuery) -> Result<Value, ConnectorError> {
        let mut current = job_id.to_string();
        let mut hops = 0u32;
        let mut state = ResolveState::QueryingStatus;

        loop {
            state = match state {
                ResolveState::QueryingStatus => {
                    let status = self
                        .transport
                        .get_json(&JobQuery::Status.path(&current))
                        .await?;
                    match JobStatus::of(&status) {
                        JobStatus::Success => ResolveState::QueryingResult { status },
                        other => {
                            debug!(job_id = %current, status = ?other, "job not complete");
                            ResolveState::Done(status)
                        }
                    }
                }
                ResolveState::QueryingResult { status } => {
                    let result = self
                        .transport
                        .get_json(&JobQuery::Result.path(&current))
                        .await?;
                    match handover_target(&result) {
                        Some(sub_job_id) if hops < self.config.max_handover_depth => {
                            hops += 1;
                            info!(job_id = %current, %sub_job_id, "following job hand-over");
                            ResolveState::FollowingSubjob { sub_job_id }
                        }
                        _ => ResolveState::Done(match query {
                            JobQuery::Status => status,
                            JobQuery::Result => result,
                        }),
                    }
                }
                ResolveState::FollowingSubjob { sub_job_id } => {
                    current = sub_job_id;
                    if hops < self.config.max_handover_depth {
                        ResolveState::QueryingStatus
                    } else {
                        ResolveState::Done(self.transport.get_json(&query.path(&current)).await?)
                    }
                }
                ResolveState::Done(response) => {
                    if hops == 0 {
                        return Ok(response);
                    }
                    return Ok(annotate(response, job_id, &current));
                }
            };
        }
    }
}

fn annotate(response: Value, original: &str, resolved: &str) -> Value {
    match response {
        Value::Object(mut map) => {
            map.insert(ORIGINAL_TASK_FIELD.to_string(), Value::from(original));
            map.insert(SUB_TASK_FIELD.to_string(), Value::from(resolved));
            Value::Object(map)
        }
        other => {
            warn!(original, resolved, "sub-job response is not an object; not annotated");
            other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::scripted::{Call, ScriptedTransport};
    use serde_json::json;

    fn get(path: &str) -> Call {
        Call::Get(path.to_string())
    }

    async fn resolve(
        transport: &ScriptedTransport,
        query: JobQuery,
    ) -> Result<Value, ConnectorError> {
        JobResolver::new(transport, ResolverConfig::default())
            .resolve("job-1", query)
            .await
    }

    fn handed_over() -> ScriptedTransport {
        ScriptedTransport::new()
            .respond("/simulations/status/job-1", json!({ "status": "SUCCESS" }))
            .respond(
                "/simulations/result/job-1",
                json!({
                    "status": "SUCCESS",
                    "result": { "status": "ORCHESTRATED", "sub_task_id": "sub-9" }
                }),
            )
            .respond(
                "/simulations/status/sub-9",
                json!({ "status": "PENDING", "progress": 0.4 }),
            )
            .respond(
                "/simulations/result/sub-9",
                json!({ "status": "SUCCESS", "result": { "success_rate": 0.93 } }),
            )
    }

    #[tokio::test]
    async fn pending_status_is_returned_verbatim_without_result_fetch() {
        let transport = ScriptedTransport::new().respond(
            "/simulations/status/job-1",
            json!({ "status": "PENDING", "progress": 0.1 }),
        );
        let response = resolve(&transport, JobQuery::Result).await.expect("resolves");
        assert_eq!(response, json!({ "status": "PENDING", "progress": 0.1 }));
        assert_eq!(transport.calls(), vec![get("/simulations/status/job-1")]);
    }

    #[tokio::test]
    async fn failure_status_is_data_not_an_error() {
        let transport = ScriptedTransport::new().respond(
            "/simulations/status/job-1",
            json!({ "status": "FAILURE", "error": "solver diverged" }),
        );
        let response = resolve(&transport, JobQuery::Status).await.expect("resolves");
        assert_eq!(JobStatus::of(&response), JobStatus::Failure);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn status_query_follows_handover_and_annotates() {
        let transport = handed_over();
        let response = resolve(&transport, JobQuery::Status).await.expect("resolves");
        assert_eq!(
            response,
            json!({
                "status": "PENDING",
                "progress": 0.4,
                "original_task_id": "job-1",
                "sub_task_id": "sub-9"
            })
        );
        assert_eq!(
            transport.calls(),
            vec![
                get("/simulations/status/job-1"),
                get("/simulations/result/job-1"),
                get("/simulations/status/sub-9"),
            ]
        );
    }

    #[tokio::test]
    async fn result_query_follows_handover_and_annotates() {
        let transport = handed_over();
        let response = resolve(&transport, JobQuery::Result).await.expect("resolves");
        assert_eq!(response["result"]["success_rate"], 0.93);
        assert_eq!(response[ORIGINAL_TASK_FIELD], "job-1");
        assert_eq!(response[SUB_TASK_FIELD], "sub-9");
        assert_eq!(
            transport.calls().last(),
            Some(&get("/simulations/result/sub-9"))
        );
    }

    #[tokio::test]
    async fn result_without_handover_is_returned_unannotated() {
        let result = json!({ "status": "SUCCESS", "result": { "success_rate": 0.88 } });
        let transport = ScriptedTransport::new()
            .respond("/simulations/status/job-1", json!({ "status": "SUCCESS" }))
            .respond("/simulations/result/job-1", result.clone());

        let response = resolve(&transport, JobQuery::Result).await.expect("resolves");
        assert_eq!(response, result);

        let response = resolve(&transport, JobQuery::Status).await.expect("resolves");
        assert_eq!(response, json!({ "status": "SUCCESS" }));
    }

    #[tokio::test]
    async fn handover_is_followed_one_level_by_default() {
        let transport = ScriptedTransport::new()
            .respond("/simulations/status/job-1", json!({ "status": "SUCCESS" }))
            .respond(
                "/simulations/result/job-1",
                json!({ "status": "ORCHESTRATED", "sub_task_id": "sub-1" }),
            )
            .respond(
                "/simulations/result/sub-1",
                json!({ "status": "ORCHESTRATED", "sub_task_id": "sub-2" }),
            );

        let response = resolve(&transport, JobQuery::Result).await.expect("resolves");
        assert_eq!(response[SUB_TASK_FIELD], "sub-1");
        assert_eq!(response[ORIGINAL_TASK_FIELD], "job-1");
        assert!(
            !transport
                .calls()
                .iter()
                .any(|call| matches!(call, Call::Get(path) if path.ends_with("sub-2")))
        );
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn deeper_handover_chains_follow_the_configured_depth() {
        let transport = ScriptedTransport::new()
            .respond("/simulations/status/job-1", json!({ "status": "SUCCESS" }))
            .respond(
                "/simulations/result/job-1",
                json!({ "result": { "status": "ORCHESTRATED", "sub_task_id": "sub-1" } }),
            )
            .respond("/simulations/status/sub-1", json!({ "status": "SUCCESS" }))
            .respond(
                "/simulations/result/sub-1",
                json!({ "result": { "status": "ORCHESTRATED", "sub_task_id": "sub-2" } }),
            )
            .respond("/simulations/result/sub-2", json!({ "result": { "success_rate": 0.7 } }));

        let resolver = JobResolver::new(
            &transport,
            ResolverConfig {
                max_handover_depth: 2,
            },
        );
        let response = resolver
            .resolve("job-1", JobQuery::Result)
            .await
            .expect("resolves");
        assert_eq!(response[ORIGINAL_TASK_FIELD], "job-1");
        assert_eq!(response[SUB_TASK_FIELD], "sub-2");
        assert_eq!(response["result"]["success_rate"], 0.7);
    }

    #[tokio::test]
    async fn zero_depth_never_follows() {
        let handover = json!({ "status": "ORCHESTRATED", "sub_task_id": "sub-1" });
        let transport = ScriptedTransport::new()
            .respond("/simulations/status/job-1", json!({ "status": "SUCCESS" }))
            .respond("/simulations/result/job-1", handover.clone());
        let resolver = JobResolver::new(
            &transport,
            ResolverConfig {
                max_handover_depth: 0,
            },
        );
        let response = resolver
            .resolve("job-1", JobQuery::Result)
            .await
            .expect("resolves");
        assert_eq!(response, handover);
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let transport = ScriptedTransport::new()
            .respond("/simulations/status/job-1", json!({ "status": "SUCCESS" }))
            .fail("/simulations/result/job-1", "connection reset");
        let err = resolve(&transport, JobQuery::Result)
            .await
            .expect_err("result fetch fails");
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn handover_to_the_same_id_is_still_annotated() {
        let handover = json!({ "status": "ORCHESTRATED", "sub_task_id": "job-1" });
        let transport = ScriptedTransport::new()
            .respond("/simulations/status/job-1", json!({ "status": "SUCCESS" }))
            .respond("/simulations/result/job-1", handover);

        let response = resolve(&transport, JobQuery::Result).await.expect("resolves");
        assert_eq!(response[ORIGINAL_TASK_FIELD], "job-1");
        assert_eq!(response[SUB_TASK_FIELD], "job-1");
        assert_eq!(
            transport.calls(),
            vec![
                get("/simulations/status/job-1"),
                get("/simulations/result/job-1"),
                get("/simulations/result/job-1"),
            ]
        );
    }

    #[test]
    fn handover_signature_requires_both_status_and_id() {
        assert_eq!(
            handover_target(&json!({ "status": "ORCHESTRATED", "sub_task_id": "s" })),
            Some("s".to_string())
        );
        assert_eq!(handover_target(&json!({ "status": "ORCHESTRATED" })), None);
        assert_eq!(
            handover_target(&json!({ "status": "SUCCESS", "sub_task_id": "s" })),
            None
        );
        assert_eq!(
            handover_target(&json!({ "result": { "status": "ORCHESTRATED", "sub_task_id": " " } })),
            None
        );
    }
}
