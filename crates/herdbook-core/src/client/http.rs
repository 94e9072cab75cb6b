use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{AnimalDependencies, ClientError, Page, TreeRequest, TreeSource};
use crate::animal::{AnimalId, AnimalRecord};
use crate::config::ApiConfig;
use crate::graph::TreeGraph;

/// REST client for the herd backend.
///
/// Responses may come bare or wrapped in a `{ "data": ... }` envelope;
/// both are accepted.
pub struct HttpTreeClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpTreeClient {
    /// Creates a client with reqwest's default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
        }
    }

    /// Creates a client from the `[api]` config section.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            client,
        })
    }

    /// Sets the bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("GET {}", url);

        let req = self.client.get(&url).header("accept", "application/json");
        match &self.token {
            Some(token) => req.header("authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, ClientError> {
        let response = req.send().await?;
        let body = Self::check_status(response).await?;
        Ok(unwrap_envelope(body))
    }

    async fn check_status(response: Response) -> Result<Value, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn fetch_tree(&self, kind: &str, request: &TreeRequest) -> Result<TreeGraph, ClientError> {
        let path = format!("animals/{}/{}", request.animal_id, kind);
        let req = self.get(&path).query(&tree_query(request));
        let body = self.send(req).await?;
        decode(body)
    }
}

#[async_trait]
impl TreeSource for HttpTreeClient {
    async fn get_ancestor_tree(&self, request: &TreeRequest) -> Result<TreeGraph, ClientError> {
        self.fetch_tree("ancestors", request).await
    }

    async fn get_descendant_tree(&self, request: &TreeRequest) -> Result<TreeGraph, ClientError> {
        self.fetch_tree("descendants", request).await
    }

    async fn get_animal_dependencies(&self, animal_id: AnimalId) -> Result<AnimalDependencies, ClientError> {
        let body = self
            .send(self.get(&format!("animals/{}/dependencies", animal_id)))
            .await?;
        decode(body)
    }

    async fn get_by_id(&self, animal_id: AnimalId) -> Result<AnimalRecord, ClientError> {
        let body = self.send(self.get(&format!("animals/{}", animal_id))).await?;
        decode(body)
    }

    async fn list_animals(&self, page: u32, per_page: u32) -> Result<Page<AnimalRecord>, ClientError> {
        let req = self
            .get("animals")
            .query(&[("page", page.to_string()), ("limit", per_page.to_string())]);
        let body = self.send(req).await?;
        decode_page(body, page)
    }
}

fn tree_query(request: &TreeRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![("max_depth", request.max_depth.to_string())];
    if !request.fields.trim().is_empty() {
        query.push(("fields", request.fields.clone()));
    }
    query
}

/// Strips a `{ "data": { ... } }` envelope around a single object.
///
/// A `data` array is left alone; it is the item list of a page.
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(body)?)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Bare(Vec<Value>),
    Paged(Page<Value>),
}

/// Decodes a list response. Records that fail to normalize are skipped.
fn decode_page(body: Value, requested: u32) -> Result<Page<AnimalRecord>, ClientError> {
    let raw = match serde_json::from_value::<ListBody>(body)? {
        ListBody::Bare(items) => Page {
            items,
            page: requested,
            total_pages: requested,
        },
        ListBody::Paged(page) => page,
    };

    let items = raw
        .items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<AnimalRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping animal record on page {}: {}", raw.page, e);
                None
            }
        })
        .collect();

    Ok(Page {
        items,
        page: raw.page,
        total_pages: raw.total_pages,
    })
}
