use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{DocumentPatch, IndexError, NoteDocument, NoteFilter, SearchIndex};
use crate::config::SearchConfig;

/// [`SearchIndex`] backed by an Elasticsearch node over its REST API.
pub struct ElasticIndex {
    client: Client,
    base_url: String,
    index: String,
    max_results: usize,
}

impl ElasticIndex {
    pub fn new(config: &SearchConfig) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_owned(),
            index: config.index.clone(),
            max_results: config.max_results,
        })
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    async fn create_index(&self) -> Result<(), IndexError> {
        let resp = self
            .client
            .put(self.index_url())
            .json(&index_mapping())
            .send()
            .await?;
        if resp.status() == StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            if body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            return Err(IndexError::Rejected { status: 400, body });
        }
        ensure_success(resp).await.map(drop)
    }
}

/// Explicit field types: ids are exact-match keywords and timestamps sort
/// numerically.
pub(crate) fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "title": { "type": "text" },
                "body": { "type": "text" },
                "notebook": { "type": "keyword" },
                "created_at": { "type": "long" },
                "updated_at": { "type": "long" },
                "attachment_id": { "type": "keyword" },
                "attachment_content": { "type": "text" }
            }
        }
    })
}

/// Translate a [`NoteFilter`] into a `_search` request body.
pub(crate) fn search_body(filter: &NoteFilter, size: usize) -> Value {
    let query = match filter {
        NoteFilter::MatchAll => json!({ "match_all": {} }),
        NoteFilter::Text(text) => json!({
            "query_string": {
                "query": text,
                "fields": ["title", "body", "attachment_content"]
            }
        }),
        NoteFilter::Notebook(id) => json!({
            "bool": { "filter": { "term": { "notebook": id.to_string() } } }
        }),
    };
    json!({
        "query": query,
        "sort": [{ "updated_at": { "order": "desc" } }],
        "size": size,
        "_source": false
    })
}

fn hit_ids(response: &Value) -> Result<Vec<String>, IndexError> {
    let hits = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| IndexError::Malformed("missing hits.hits".into()))?;
    hits.iter()
        .map(|hit| {
            hit.get("_id")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| IndexError::Malformed("hit without _id".into()))
        })
        .collect()
}

async fn ensure_success(resp: Response) -> Result<Response, IndexError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(IndexError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn ensure_index(&self) -> Result<(), IndexError> {
        self.create_index().await
    }

    #[instrument(skip(self, doc), fields(index = %self.index))]
    async fn put_document(&self, id: &str, doc: &NoteDocument) -> Result<(), IndexError> {
        let resp = self
            .client
            .put(format!("{}/_doc/{}", self.index_url(), id))
            .json(doc)
            .send()
            .await?;
        ensure_success(resp).await?;
        debug!("Document indexed");
        Ok(())
    }

    #[instrument(skip(self, patch), fields(index = %self.index))]
    async fn patch_document(&self, id: &str, patch: &DocumentPatch) -> Result<(), IndexError> {
        let resp = self
            .client
            .post(format!("{}/_update/{}", self.index_url(), id))
            .json(&json!({ "doc": patch }))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(IndexError::MissingDocument(id.to_owned()));
        }
        ensure_success(resp).await?;
        debug!("Document patched");
        Ok(())
    }

    #[instrument(skip(self), fields(index = %self.index))]
    async fn drop_all(&self) -> Result<(), IndexError> {
        let resp = self.client.delete(self.index_url()).send().await?;
        if resp.status() != StatusCode::NOT_FOUND {
            ensure_success(resp).await?;
        }
        self.create_index().await
    }

    async fn search(&self, filter: &NoteFilter) -> Result<Vec<String>, IndexError> {
        let resp = self
            .client
            .post(format!("{}/_search", self.index_url()))
            .json(&search_body(filter, self.max_results))
            .send()
            .await?;
        // Nothing has been indexed yet.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body: Value = ensure_success(resp).await?.json().await?;
        hit_ids(&body)
    }
}
