use crate::application_impl::Session;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";
const JSON_MIME: &str = "application/json";

/// Result of a single attempt that did not succeed.
#[derive(Debug)]
pub enum ExecuteError {
    /// 401 or 403; the request may be replayed after a token refresh.
    Unauthorized { status: u16, status_text: String },
    Failed(ClientError),
}

impl From<ClientError> for ExecuteError {
    fn from(error: ClientError) -> Self {
        ExecuteError::Failed(error)
    }
}

impl ExecuteError {
    /// Collapse into a terminal error; a repeated 401/403 is an ordinary failure.
    pub fn into_terminal(self) -> ClientError {
        match self {
            ExecuteError::Unauthorized {
                status,
                status_text,
            } => ClientError::RequestFailed {
                status,
                status_text,
            },
            ExecuteError::Failed(e) => e,
        }
    }
}

pub fn is_token_expired(status: u16) -> bool {
    status == 401 || status == 403
}

pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    base_url: Option<String>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: Option<String>) -> Self {
        let base_url = base_url.filter(|u| !u.trim().is_empty());
        RequestExecutor {
            transport,
            base_url,
        }
    }

    pub fn build_url(&self, endpoint: &str, query: &[(String, String)]) -> Result<String, ClientError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| ClientError::Config("api.base_url is not set".to_string()))?;
        let base = Url::parse(base)
            .map_err(|e| ClientError::Config(format!("invalid api.base_url {:?}: {}", base, e)))?;
        let mut url = base
            .join(endpoint)
            .map_err(|e| ClientError::Config(format!("invalid endpoint {:?}: {}", endpoint, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url.into())
    }

    async fn headers_for(
        &self,
        session: &Session,
        options: &RequestOptions,
    ) -> Result<Vec<(String, String)>, ClientError> {
        let mut headers: Vec<(String, String)> = options
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        set_header(&mut headers, CONTENT_TYPE, JSON_MIME.to_string());
        if let Some(token) = session.access_token().await? {
            set_header(&mut headers, AUTHORIZATION, format!("Bearer {}", token));
        }
        Ok(headers)
    }

    /// One attempt with the session's current credentials.
    pub async fn execute(
        &self,
        session: &Session,
        request: &PendingRequest,
    ) -> Result<Value, ExecuteError> {
        let url = self.build_url(&request.endpoint, &request.options.query)?;
        let headers = self.headers_for(session, &request.options).await?;
        let body = encode_body(request.body.as_ref())?;

        let response = self
            .transport
            .send(HttpRequest {
                method: request.method,
                url,
                headers,
                body,
            })
            .await
            .map_err(ClientError::from)?;

        if !response.is_success() {
            if is_token_expired(response.status) {
                return Err(ExecuteError::Unauthorized {
                    status: response.status,
                    status_text: response.status_text,
                });
            }
            return Err(ClientError::RequestFailed {
                status: response.status,
                status_text: response.status_text,
            }
            .into());
        }

        Ok(decode_body(&response.body)?)
    }

    /// A bare JSON call without session credentials, used by the token endpoints.
    pub async fn send_anonymous(
        &self,
        method: HttpMethod,
        endpoint: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<HttpResponse, ClientError> {
        let url = self.build_url(endpoint, query)?;
        let response = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers: vec![(CONTENT_TYPE.to_string(), JSON_MIME.to_string())],
                body: encode_body(body)?,
            })
            .await?;
        Ok(response)
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value));
}

fn encode_body(body: Option<&Value>) -> Result<Option<Vec<u8>>, ClientError> {
    body.map(|b| serde_json::to_vec(b).map_err(|e| ClientError::Encode(e.to_string())))
        .transpose()
}

pub(crate) fn decode_body(body: &[u8]) -> Result<Value, ClientError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))
}
