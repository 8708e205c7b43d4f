//! HTTP implementations of the list, mutation and summary collaborators.
//!
//! One [`ApiClient`] is shared by every screen. Each screen gets a
//! [`Resource`] for its collection path:
//!
//! | Call | Request |
//! |------|---------|
//! | list | `GET {path}?page=&pageSize=&<filters>` |
//! | toggle | `PATCH {path}/{id}/status` with `{"status": ...}` |
//! | delete | `DELETE {path}/{id}` |
//! | summary | `GET {path}?from=&to=` |

use async_trait::async_trait;
use opsdash_list::calendar::{DailySummary, DateRange, RangeSource};
use opsdash_list::{
    ApiError, ListPage, ListRequest, ListResponse, ListSource, MutationAck, Record, RowId,
    RowMutations, RowStatus,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::time::Duration;
use url::Url;

/// Errors building a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("base URL cannot carry a path: {0}")]
    NotABase(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Shared HTTP client rooted at the API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ClientError::NotABase(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(ApiClient { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Typed handle for the collection at `path`.
    pub fn resource<R>(&self, path: &'static str) -> Resource<R> {
        Resource {
            api: self.clone(),
            path,
            _record: PhantomData,
        }
    }

    /// Handle for the date-range summary endpoint at `path`.
    pub fn summaries(&self, path: &'static str) -> Summaries {
        Summaries {
            api: self.clone(),
            path,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejected cannot-be-a-base URLs, so path segments are available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.extend(segment.split('/').filter(|s| !s.is_empty()));
            }
        }
        url
    }
}

/// Map a transport failure.
fn transport(err: reqwest::Error) -> ApiError {
    if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Turn a non-2xx answer into [`ApiError::Status`], keeping the server's
/// message when the body carries one.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MutationAck>(&body)
        .ok()
        .and_then(|ack| ack.message);
    tracing::debug!(status = status.as_u16(), "request failed with HTTP status");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Read a mutation acknowledgement. An empty or unparseable 2xx body counts
/// as success.
async fn read_ack(response: Response) -> Result<(), ApiError> {
    let response = check_status(response).await?;
    let body = response.text().await.map_err(transport)?;
    if body.trim().is_empty() {
        return Ok(());
    }
    serde_json::from_str::<MutationAck>(&body)
        .unwrap_or_default()
        .into_result()
}

/// A collection endpoint serving records of type `R`.
pub struct Resource<R> {
    api: ApiClient,
    path: &'static str,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Resource<R> {
    fn clone(&self) -> Self {
        Resource {
            api: self.api.clone(),
            path: self.path,
            _record: PhantomData,
        }
    }
}

impl<R> Resource<R> {
    pub fn path(&self) -> &'static str {
        self.path
    }

    fn list_url(&self, request: &ListRequest) -> Url {
        let mut url = self.api.endpoint(&[self.path]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &request.page.to_string());
            query.append_pair("pageSize", &request.page_size.to_string());
            for (key, value) in request.filters.iter() {
                query.append_pair(key, value);
            }
        }
        url
    }
}

#[derive(Serialize)]
struct StatusBody {
    status: RowStatus,
}

#[async_trait]
impl<R> ListSource<R> for Resource<R>
where
    R: Record + DeserializeOwned,
{
    async fn fetch(&self, request: ListRequest) -> Result<ListPage<R>, ApiError> {
        let url = self.list_url(&request);
        tracing::trace!(%url, "GET list");
        let response = self.api.client.get(url).send().await.map_err(transport)?;
        let response = check_status(response).await?;
        let body: ListResponse<R> = response.json().await.map_err(transport)?;
        body.into_page(&request)
    }
}

#[async_trait]
impl<R: Send + Sync + 'static> RowMutations for Resource<R> {
    async fn toggle_status(&self, id: &RowId, target: RowStatus) -> Result<(), ApiError> {
        let url = self.api.endpoint(&[self.path, id.as_str(), "status"]);
        tracing::trace!(%url, %target, "PATCH status");
        let response = self
            .api
            .client
            .patch(url)
            .json(&StatusBody { status: target })
            .send()
            .await
            .map_err(transport)?;
        read_ack(response).await
    }

    async fn delete(&self, id: &RowId) -> Result<(), ApiError> {
        let url = self.api.endpoint(&[self.path, id.as_str()]);
        tracing::trace!(%url, "DELETE row");
        let response = self.api.client.delete(url).send().await.map_err(transport)?;
        read_ack(response).await
    }
}

/// Daily summary endpoint.
#[derive(Clone)]
pub struct Summaries {
    api: ApiClient,
    path: &'static str,
}

#[async_trait]
impl RangeSource for Summaries {
    async fn summaries(&self, range: DateRange) -> Result<Vec<DailySummary>, ApiError> {
        let mut url = self.api.endpoint(&[self.path]);
        url.query_pairs_mut()
            .append_pair("from", &range.from.to_string())
            .append_pair("to", &range.to.to_string());
        tracing::trace!(%url, "GET summary");
        let response = self.api.client.get(url).send().await.map_err(transport)?;
        let response = check_status(response).await?;
        let body: ListResponse<DailySummary> = response.json().await.map_err(transport)?;
        if body.success == Some(false) {
            return Err(ApiError::rejected(body.message));
        }
        Ok(body.data)
    }
}
