use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::Transport;
use crate::error::ConnectorError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Get(String),
    Post(String, Value),
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: HashMap<String, Result<Value, ConnectorError>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), Ok(body));
        self
    }

    pub(crate) fn fail(mut self, path: &str, message: &str) -> Self {
        self.responses.insert(
            path.to_string(),
            Err(ConnectorError::Transport(message.to_string())),
        );
        self
    }

    pub(crate) fn reject(mut self, path: &str, status: u16, body: &str) -> Self {
        self.responses.insert(
            path.to_string(),
            Err(ConnectorError::Api {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn answer(&self, call: Call, path: &str) -> Result<Value, ConnectorError> {
        self.calls.lock().expect("calls lock").push(call);
        match self.responses.get(path) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(ConnectorError::Transport(message))) => {
                Err(ConnectorError::Transport(message.clone()))
            }
            Some(Err(ConnectorError::Api { status, body })) => Err(ConnectorError::Api {
                status: *status,
                body: body.clone(),
            }),
            Some(Err(other)) => Err(ConnectorError::Transport(other.to_string())),
            None => Err(ConnectorError::Api {
                status: 404,
                body: format!("no scripted response for {path}"),
            }),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn post_json(&self, path: &str, body: Value) -> Result<Value, ConnectorError> {
        self.answer(Call::Post(path.to_string(), body), path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, ConnectorError> {
        self.answer(Call::Get(path.to_string()), path)
    }
}
