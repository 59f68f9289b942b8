use crate::traits::IndexIngestor;
use crate::{Chunk, IndexError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

const BACKEND: &str = "index-service";

#[derive(Debug, Deserialize)]
struct IndexRecord {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct IndexListResponse {
    #[serde(default)]
    indexes: Vec<IndexRecord>,
}

/// Client for a remote index service that embeds and stores chunk records.
pub struct HttpIndexStore {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl HttpIndexStore {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, IndexError> {
        let base = Url::parse(endpoint.trim())?;
        if base.cannot_be_a_base() {
            return Err(IndexError::Request(format!(
                "{endpoint} cannot be used as a base url"
            )));
        }

        Ok(Self {
            client: Client::new(),
            base,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, IndexError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| IndexError::Request(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn find_index(&self, name: &str) -> Result<Option<String>, IndexError> {
        let mut url = self.url_for(&["indexes"])?;
        url.query_pairs_mut().append_pair("name", name);

        let response = checked(self.authorized(self.client.get(url)).send().await?).await?;
        let listed: IndexListResponse = response.json().await?;

        Ok(listed
            .indexes
            .into_iter()
            .find(|index| index.name == name)
            .map(|index| index.id))
    }
}

async fn checked(response: Response) -> Result<Response, IndexError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(IndexError::BackendResponse {
        backend: BACKEND.to_string(),
        details: if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        },
    })
}

fn chunk_record(chunk: &Chunk) -> Value {
    json!({
        "id": chunk.chunk_id,
        "text": chunk.text,
        "metadata": {
            "source": chunk.metadata.source,
            "niveau": chunk.metadata.niveau,
            "matiere": chunk.metadata.matiere,
            "cours": chunk.metadata.cours,
            "page": chunk.page_number,
            "ord": chunk.ordinal,
        },
    })
}

#[async_trait]
impl IndexIngestor for HttpIndexStore {
    async fn create_or_get_index(&self, name: &str) -> Result<String, IndexError> {
        if let Some(id) = self.find_index(name).await? {
            debug!(index = name, id = %id, "reusing existing index");
            return Ok(id);
        }

        let url = self.url_for(&["indexes"])?;
        let response = checked(
            self.authorized(self.client.post(url))
                .json(&json!({ "name": name }))
                .send()
                .await?,
        )
        .await?;
        let created: IndexRecord = response.json().await?;
        debug!(index = name, id = %created.id, "created index");

        Ok(created.id)
    }

    async fn add_chunks(&self, index_id: &str, chunks: &[Chunk]) -> Result<(), IndexError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let documents = chunks.iter().map(chunk_record).collect::<Vec<_>>();
        let url = self.url_for(&["indexes", index_id, "documents"])?;
        checked(
            self.authorized(self.client.post(url))
                .json(&json!({ "documents": documents }))
                .send()
                .await?,
        )
        .await?;

        Ok(())
    }
}
