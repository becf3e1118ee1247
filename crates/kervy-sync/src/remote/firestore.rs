//! # Firestore REST Client
//!
//! [`RemoteStore`] over the Cloud Firestore v1 REST API.
//!
//! ## Request Mapping
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────────────────┐
//! │ Operation    │ HTTP                                                      │
//! ├──────────────┼───────────────────────────────────────────────────────────┤
//! │ create       │ POST   {docs}/{collection}                                │
//! │ get          │ GET    {docs}/{collection}/{id}                           │
//! │ query        │ POST   {docs}:runQuery   (structuredQuery)                │
//! │ update       │ PATCH  {docs}/{collection}/{id}?updateMask.fieldPaths=..  │
//! │ delete       │ DELETE {docs}/{collection}/{id}                           │
//! │ commit       │ POST   {docs}:commit     (writes[])                       │
//! └──────────────┴───────────────────────────────────────────────────────────┘
//!   {docs} = {firestore_url}/v1/projects/{project}/databases/(default)/documents
//! ```
//!
//! Firestore wraps every value in a typed envelope (`stringValue`,
//! `integerValue`, `mapValue`, ...). [`encode_value`] and [`decode_value`]
//! convert between those envelopes and plain JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use kervy_core::Collection;

use super::{BatchWrite, Direction, Document, Query, RemoteStore, TokenCell};
use crate::config::FirebaseSettings;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Value Codec
// =============================================================================

/// Wraps a plain JSON value in Firestore's typed envelope.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encodes every field of a document.
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Unwraps a Firestore typed envelope into plain JSON.
///
/// Timestamps, references and geo points come back as their string or map
/// representation; the application never writes those types.
pub fn decode_value(value: &Value) -> Value {
    let Some(envelope) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = envelope.get("stringValue") {
        return s.clone();
    }
    if let Some(i) = envelope.get("integerValue") {
        return match i {
            Value::String(raw) => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.clone())),
            other => other.clone(),
        };
    }
    if let Some(d) = envelope.get("doubleValue") {
        return d.clone();
    }
    if let Some(b) = envelope.get("booleanValue") {
        return b.clone();
    }
    if envelope.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(t) = envelope.get("timestampValue") {
        return t.clone();
    }
    if let Some(r) = envelope.get("referenceValue") {
        return r.clone();
    }
    if let Some(array) = envelope.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(map) = envelope.get("mapValue") {
        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(decode_fields)
            .unwrap_or_default();
        return Value::Object(fields);
    }
    if let Some(geo) = envelope.get("geoPointValue") {
        return geo.clone();
    }

    Value::Null
}

/// Decodes every field of a document.
pub fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

/// Decodes a Firestore document resource into a [`Document`].
fn decode_document(resource: &Value) -> SyncResult<Document> {
    let name = resource
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::DeserializationFailed("document has no name".into()))?;

    let id = name.rsplit('/').next().unwrap_or(name).to_string();
    let fields = resource
        .get("fields")
        .and_then(Value::as_object)
        .map(decode_fields)
        .unwrap_or_default();

    Ok(Document { id, fields })
}

// =============================================================================
// Firestore Client
// =============================================================================

/// Firestore REST client.
///
/// Requests carry the signed-in user's ID token from the shared [`TokenCell`].
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    token: TokenCell,
}

impl FirestoreClient {
    pub fn new(settings: &FirebaseSettings, token: TokenCell) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SyncError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(FirestoreClient {
            client,
            base_url: settings.firestore_url.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            token,
        })
    }

    /// Resource name prefix: `projects/{p}/databases/(default)/documents`.
    fn root_name(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn documents_url(&self) -> String {
        format!("{}/v1/{}", self.base_url, self.root_name())
    }

    fn document_name(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{}", self.root_name(), collection, id)
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.documents_url(),
            collection,
            urlencoding::encode(id)
        )
    }

    async fn bearer(&self) -> SyncResult<String> {
        self.token.bearer().await
    }

    /// Maps a non-success response onto a [`SyncError`].
    async fn check(response: Response) -> SyncResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);

        warn!(status = status.as_u16(), message = %message, "Firestore request failed");

        match status {
            StatusCode::UNAUTHORIZED => Err(SyncError::NotAuthenticated),
            _ => Err(SyncError::Remote {
                status: status.as_u16(),
                message,
            }),
        }
    }

    fn structured_query(collection: Collection, query: &Query) -> Value {
        let mut structured = Map::new();
        structured.insert("from".into(), json!([{ "collectionId": collection.as_str() }]));

        let filters: Vec<Value> = query
            .filters
            .iter()
            .map(|f| {
                json!({
                    "fieldFilter": {
                        "field": { "fieldPath": f.field },
                        "op": "EQUAL",
                        "value": encode_value(&f.value),
                    }
                })
            })
            .collect();

        match filters.len() {
            0 => {}
            1 => {
                structured.insert("where".into(), filters[0].clone());
            }
            _ => {
                structured.insert(
                    "where".into(),
                    json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
                );
            }
        }

        if let Some(order) = &query.order_by {
            let direction = match order.direction {
                Direction::Ascending => "ASCENDING",
                Direction::Descending => "DESCENDING",
            };
            structured.insert(
                "orderBy".into(),
                json!([{ "field": { "fieldPath": order.field }, "direction": direction }]),
            );
        }

        if let Some(limit) = query.limit {
            structured.insert("limit".into(), json!(limit));
        }

        json!({ "structuredQuery": structured })
    }

    fn encode_write(&self, write: &BatchWrite) -> Value {
        match write {
            BatchWrite::Update {
                collection,
                id,
                fields,
            } => json!({
                "update": {
                    "name": self.document_name(*collection, id),
                    "fields": encode_fields(fields),
                },
                "updateMask": { "fieldPaths": fields.keys().collect::<Vec<_>>() },
                "currentDocument": { "exists": true },
            }),
            BatchWrite::Delete { collection, id } => json!({
                "delete": self.document_name(*collection, id),
            }),
        }
    }
}

#[async_trait]
impl RemoteStore for FirestoreClient {
    async fn create(&self, collection: Collection, fields: Map<String, Value>) -> SyncResult<String> {
        let token = self.bearer().await?;
        let url = format!("{}/{}", self.documents_url(), collection);

        debug!(collection = %collection, "Creating document");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;
        let body: Value = Self::check(response).await?.json().await?;

        Ok(decode_document(&body)?.id)
    }

    async fn get(&self, collection: Collection, id: &str) -> SyncResult<Option<Document>> {
        let token = self.bearer().await?;

        let response = self
            .client
            .get(self.document_url(collection, id))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: Value = Self::check(response).await?.json().await?;
        decode_document(&body).map(Some)
    }

    async fn query(&self, collection: Collection, query: &Query) -> SyncResult<Vec<Document>> {
        let token = self.bearer().await?;
        let url = format!("{}:runQuery", self.documents_url());

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&Self::structured_query(collection, query))
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;

        // Rows without a `document` only carry a read time.
        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(decode_document)
            .collect()
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> SyncResult<()> {
        let token = self.bearer().await?;

        let mut params: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        params.push(("currentDocument.exists", "true"));

        let response = self
            .client
            .patch(self.document_url(collection, id))
            .query(&params)
            .bearer_auth(token)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> SyncResult<()> {
        let token = self.bearer().await?;

        let response = self
            .client
            .delete(self.document_url(collection, id))
            .bearer_auth(token)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn commit(&self, writes: Vec<BatchWrite>) -> SyncResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let token = self.bearer().await?;
        let url = format!("{}:commit", self.documents_url());
        let body = json!({
            "writes": writes.iter().map(|w| self.encode_write(w)).collect::<Vec<_>>(),
        });

        debug!(writes = writes.len(), "Committing batch");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}
