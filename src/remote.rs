use crate::model::{Note, NoteId};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Map, Value};
use std::fmt;
use std::future::Future;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Network(String),
}

impl ApiError {
    /// Builds the error for a non-success status from its (possibly empty)
    /// payload.
    pub fn from_payload(status: u16, payload: &Value) -> Self {
        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .filter(|msg| !msg.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed ({})", status));
        ApiError::Status { status, message }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// One HTTP round trip. Implementations report only transport failures as
/// errors; status handling belongs to [`RemoteClient`].
pub trait Transport {
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> impl Future<Output = Result<RawResponse, ApiError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("noteline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> impl Future<Output = Result<RawResponse, ApiError>> + Send {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .request(method.as_reqwest(), url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }
        async move {
            let resp = req
                .send()
                .await
                .map_err(|err| ApiError::Network(err.to_string()))?;
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Ok(RawResponse { status, body })
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteClient<T> {
    transport: T,
}

impl<T: Transport> RemoteClient<T> {
    pub fn new(transport: T) -> Self {
        RemoteClient { transport }
    }

    /// Issues a request and normalizes the outcome.
    ///
    /// Bodies that are not valid JSON read as `{}`. Non-2xx statuses become
    /// [`ApiError::Status`] carrying the payload's `error` text when present.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        tracing::debug!(%method, path, "remote request");
        let raw = match self.transport.send(method, path, body.as_ref()).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(%method, path, error = %err, "remote request failed");
                return Err(err);
            }
        };
        let data = parse_body(&raw.body);
        if !(200..300).contains(&raw.status) {
            let err = ApiError::from_payload(raw.status, &data);
            tracing::warn!(%method, path, status = raw.status, error = %err, "remote request rejected");
            return Err(err);
        }
        Ok(data)
    }

    pub async fn list_notes(&self) -> Result<Value, ApiError> {
        self.request("/api/notes", Method::Get, None).await
    }

    pub async fn create_note(&self, text: &str, deadline: &str) -> Result<Value, ApiError> {
        let body = json!({ "text": text, "deadline": deadline });
        self.request("/api/notes", Method::Post, Some(body)).await
    }

    pub async fn update_note(
        &self,
        id: NoteId,
        text: &str,
        deadline: &str,
    ) -> Result<Value, ApiError> {
        let body = json!({ "text": text, "deadline": deadline });
        self.request(&note_path(id), Method::Put, Some(body)).await
    }

    pub async fn delete_note(&self, id: NoteId) -> Result<Value, ApiError> {
        self.request(&note_path(id), Method::Delete, None).await
    }
}

pub fn note_path(id: NoteId) -> String {
    format!("/api/notes/{}", id)
}

/// Pulls the `note` field out of a create/update response, if usable.
pub fn note_from_response(data: &Value) -> Option<Note> {
    let raw = data.get("note")?;
    match serde_json::from_value(raw.clone()) {
        Ok(note) => Some(note),
        Err(err) => {
            tracing::warn!(error = %err, "response carried an unusable note");
            None
        }
    }
}

fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Map::new()))
}
