//! Client for a remote libSQL service's HTTP pipeline endpoint.
//!
//! Only batch execution is needed here: the schema tool sends DDL, the
//! service runs it. Everything else about the remote database is the
//! service's business.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Credentials;
use crate::error::{DbError, Result};

#[derive(Debug, Serialize)]
struct PipelineRequest<'a> {
    baton: Option<String>,
    requests: Vec<StreamRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamRequest<'a> {
    Execute { stmt: Statement<'a> },
    Close,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    sql: &'a str,
}

#[derive(Debug, Deserialize)]
struct PipelineResponse {
    results: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamResult {
    Ok {},
    Error { error: StreamError },
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

pub struct RemoteClient {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl RemoteClient {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: pipeline_url(&credentials.url)?,
            auth_token: credentials.auth_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run `statements` in order on one stream. Stops at the first failure.
    pub async fn execute_batch(&self, statements: &[String]) -> Result<()> {
        let body = pipeline_body(statements);

        let mut req = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        debug!("Sending {} statements to {}", statements.len(), self.endpoint);
        let resp = req.send().await?.error_for_status()?;
        let parsed: PipelineResponse = resp.json().await?;
        check_results(&parsed)?;

        info!("Remote batch of {} statements applied", statements.len());
        Ok(())
    }
}

fn pipeline_body(statements: &[String]) -> PipelineRequest<'_> {
    let mut requests: Vec<StreamRequest<'_>> = statements
        .iter()
        .map(|sql| StreamRequest::Execute {
            stmt: Statement { sql },
        })
        .collect();
    requests.push(StreamRequest::Close);
    PipelineRequest {
        baton: None,
        requests,
    }
}

fn check_results(resp: &PipelineResponse) -> Result<()> {
    for result in &resp.results {
        if let StreamResult::Error { error } = result {
            let message = match &error.code {
                Some(code) => format!("{} ({})", error.message, code),
                None => error.message.clone(),
            };
            return Err(DbError::Remote(message));
        }
    }
    Ok(())
}

/// HTTP pipeline endpoint for a database url.
pub fn pipeline_url(url: &str) -> Result<String> {
    let base = if let Some(rest) = url.strip_prefix("libsql://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else if url.starts_with("https://") || url.starts_with("http://") {
        url.to_string()
    } else {
        return Err(DbError::Remote(format!("not a remote url: {url}")));
    };
    Ok(format!("{}/v2/pipeline", base.trim_end_matches('/')))
}
