//! JSON message envelopes for exchanging queries and results with a remote peer.
//!
//! ```text
//! {"type":"SERVER_DATABASE_QUERY","payload":"GET IN People"}
//! {"type":"SERVER_DATABASE_QUERY_RESPONSE_SUCCESS","payload":[{"id":"...","data":[...]}]}
//! {"type":"SERVER_DATABASE_QUERY_RESPONSE_ERROR","payload":{"TableNotFound":{"table":"People"}}}
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ast::QuerySet,
    database::Database,
    entry::EntrySet,
    error::{QueryError, QueryResult},
};

pub const QUERY_TAG: &str = "SERVER_DATABASE_QUERY";
pub const SUCCESS_TAG: &str = "SERVER_DATABASE_QUERY_RESPONSE_SUCCESS";
pub const ERROR_TAG: &str = "SERVER_DATABASE_QUERY_RESPONSE_ERROR";

/// Body of a query request: either DSL text or an already parsed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryPayload {
    Raw(String),
    Parsed(QuerySet),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Envelope {
    #[serde(rename = "SERVER_DATABASE_QUERY")]
    Query(QueryPayload),
    #[serde(rename = "SERVER_DATABASE_QUERY_RESPONSE_SUCCESS")]
    Success(EntrySet),
    #[serde(rename = "SERVER_DATABASE_QUERY_RESPONSE_ERROR")]
    Error(QueryError),
}

impl Envelope {
    /// Builds a request carrying DSL text.
    pub fn request(text: impl Into<String>) -> Self {
        Self::Query(QueryPayload::Raw(text.into()))
    }

    /// Builds a request carrying a parsed batch.
    pub fn request_parsed(queries: QuerySet) -> Self {
        Self::Query(QueryPayload::Parsed(queries))
    }

    /// The wire name of the message type.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Query(_) => QUERY_TAG,
            Self::Success(_) => SUCCESS_TAG,
            Self::Error(_) => ERROR_TAG,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Converts a response back into the result it carries.
    ///
    /// # Errors
    /// Returns the carried error for an error response, and
    /// [QueryError::InvalidRequest] for a request envelope.
    pub fn into_result(self) -> QueryResult<EntrySet> {
        match self {
            Self::Success(entries) => Ok(entries),
            Self::Error(e) => Err(e),
            Self::Query(_) => Err(QueryError::InvalidRequest {
                reason: format!("expected a response, got {QUERY_TAG}"),
            }),
        }
    }
}

impl From<QueryResult<EntrySet>> for Envelope {
    fn from(result: QueryResult<EntrySet>) -> Self {
        match result {
            Ok(entries) => Self::Success(entries),
            Err(e) => Self::Error(e),
        }
    }
}

impl Database {
    /// Answers a request envelope with a success or error envelope.
    /// Anything other than a query request is answered with [QueryError::InvalidRequest].
    pub fn handle(&self, request: &Envelope) -> Envelope {
        debug!(tag = request.tag(), "handling envelope");
        match request {
            Envelope::Query(QueryPayload::Raw(text)) => self.execute(text).into(),
            Envelope::Query(QueryPayload::Parsed(queries)) => self.query(queries).into(),
            other => Envelope::Error(QueryError::InvalidRequest {
                reason: format!("expected {QUERY_TAG}, got {}", other.tag()),
            }),
        }
    }
}
