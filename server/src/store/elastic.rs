//! Elasticsearch backend over the REST API

use async_trait::async_trait;
use common::{JobOffer, JobOfferPatch};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{DocumentStore, SEARCH_FIELDS, StoreError};

/// Reply to `POST /{index}/_doc`
#[derive(Debug, Deserialize)]
struct IndexReply {
    #[serde(rename = "_id")]
    id: String,
}

/// Reply to `GET /{index}/_doc/{id}`
#[derive(Debug, Deserialize)]
struct GetReply {
    #[serde(rename = "_id")]
    id: String,
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Value>,
}

/// Reply to `POST /{index}/_search`
#[derive(Debug, Deserialize)]
struct SearchReply {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: Value,
}

/// Job offer store backed by an Elasticsearch index
pub struct ElasticStore {
    client: Client,
    base_url: Url,
    index: String,
    credentials: Option<(String, String)>,
}

impl ElasticStore {
    /// Creates a store for `index` on the cluster at `base_url`.
    /// No request is sent until the first operation.
    pub fn new(
        base_url: &str,
        index: &str,
        credentials: Option<(String, String)>,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Internal(format!("invalid store URL {base_url}: {e}")))?;
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url,
            index: index.to_string(),
            credentials,
        })
    }

    /// URL for `/{index}/{segments...}` with each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        if let Some(segment) = segments.iter().find(|s| !is_addressable(**s)) {
            return Err(StoreError::rejected(404, format!("[{segment}]: document missing")));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Internal(format!("store URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(&self.index)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }

    /// Sends the request and returns the status with the parsed JSON body
    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, Value), StoreError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    /// Like [`Self::send`], but any non-2xx status is an error
    async fn send_ok(&self, request: RequestBuilder) -> Result<Value, StoreError> {
        let (status, body) = self.send(request).await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(rejection(status, &body))
        }
    }
}

/// Builds an error from a failed reply, keeping the store's own reason when it gives one
fn rejection(status: StatusCode, body: &Value) -> StoreError {
    let reason = [body.pointer("/error/reason"), body.get("error"), body.get("result")]
        .into_iter()
        .flatten()
        .find_map(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    StoreError::rejected(status.as_u16(), reason)
}

/// `.` and `..` cannot be sent as path segments, URL normalization removes them
fn is_addressable(id: &str) -> bool {
    !matches!(id, "." | "..")
}

/// Query body for a search, `match_all` when there is no query text
fn search_body(query: Option<&str>) -> Value {
    match query {
        Some(text) => json!({
            "query": {
                "multi_match": {
                    "query": text,
                    "fields": SEARCH_FIELDS,
                }
            }
        }),
        None => json!({ "query": { "match_all": {} } }),
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn index(&self, source: &JobOffer, refresh: bool) -> Result<String, StoreError> {
        let url = self.url(&["_doc"])?;
        let mut request = self.request(Method::POST, url).json(source);
        if refresh {
            request = request.query(&[("refresh", "true")]);
        }

        let reply: IndexReply = serde_json::from_value(self.send_ok(request).await?)?;
        debug!(id = %reply.id, "indexed job offer");
        Ok(reply.id)
    }

    async fn get(&self, id: &str) -> Result<Option<JobOffer>, StoreError> {
        // No document can be addressed by a dot-only id
        if !is_addressable(id) {
            return Ok(None);
        }
        let url = self.url(&["_doc", id])?;
        let (status, body) = self.send(self.request(Method::GET, url)).await?;

        // A missing document is a 404 carrying `found: false`; a missing index is not
        if status == StatusCode::NOT_FOUND && body.get("found") == Some(&Value::Bool(false)) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        let reply: GetReply = serde_json::from_value(body)?;
        match (reply.found, reply.source) {
            (true, Some(source)) => Ok(Some(JobOffer::from_source(reply.id, source)?)),
            _ => Ok(None),
        }
    }

    async fn update(&self, id: &str, patch: &JobOfferPatch) -> Result<(), StoreError> {
        let url = self.url(&["_update", id])?;
        let request = self
            .request(Method::POST, url)
            .json(&json!({ "doc": patch }));
        self.send_ok(request).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let url = self.url(&["_doc", id])?;
        self.send_ok(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn search(&self, query: Option<&str>) -> Result<Vec<JobOffer>, StoreError> {
        let url = self.url(&["_search"])?;
        let request = self.request(Method::POST, url).json(&search_body(query));

        let reply: SearchReply = serde_json::from_value(self.send_ok(request).await?)?;
        reply
            .hits
            .hits
            .into_iter()
            .map(|hit| JobOffer::from_source(hit.id, hit.source).map_err(StoreError::from))
            .collect()
    }
}
