use thiserror::Error;

// A remote `FAILURE` job status is response data, not an error.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("row {row}: missing required parameter `{name}`")]
    MissingParameter { row: usize, name: String },

    #[error("row {row}: invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        row: usize,
        name: String,
        reason: String,
    },

    #[error("row {row}: unknown operation `{operation}`")]
    UnknownOperation { row: usize, operation: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("calculation service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not decode service response: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<ConnectorError>,
    },
}

impl ConnectorError {
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::MissingParameter { row, .. }
            | Self::InvalidParameter { row, .. }
            | Self::UnknownOperation { row, .. }
            | Self::Row { row, .. } => Some(*row),
            _ => None,
        }
    }

    pub fn at_row(self, row: usize) -> Self {
        if self.row().is_some() {
            return self;
        }
        Self::Row {
            row,
            source: Box::new(self),
        }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
