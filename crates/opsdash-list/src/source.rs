//! Contracts of the backend collaborators a list screen talks to.

use crate::error::ApiError;
use crate::filter::FilterSet;
use crate::record::{RowId, RowStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One page request for the effective `(filters, page, pageSize)` tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "FilterSet::is_empty")]
    pub filters: FilterSet,
}

/// Raw list response as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<R> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Vec::new")]
    pub data: Vec<R>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_records: Option<u64>,
}

impl<R> ListResponse<R> {
    /// Normalize into a [`ListPage`].
    ///
    /// Totals are taken from the response when present and otherwise derived
    /// from `data`. `total_pages` is never below 1.
    pub fn into_page(self, request: &ListRequest) -> Result<ListPage<R>, ApiError> {
        if self.success == Some(false) {
            return Err(ApiError::rejected(self.message));
        }

        let total_records = self.total_records.unwrap_or(self.data.len() as u64);
        let page_size = u64::from(self.page_size.unwrap_or(request.page_size).max(1));
        let total_pages = self
            .total_pages
            .unwrap_or_else(|| total_records.div_ceil(page_size) as u32)
            .max(1);

        Ok(ListPage {
            rows: self.data,
            total_records,
            total_pages,
        })
    }
}

/// A normalized page of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<R> {
    pub rows: Vec<R>,
    pub total_records: u64,
    pub total_pages: u32,
}

/// Acknowledgement of a toggle or delete.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MutationAck {
    /// An acknowledgement without an explicit `success: false` is a success;
    /// the HTTP layer has already turned non-2xx answers into errors.
    pub fn into_result(self) -> Result<(), ApiError> {
        match self.success {
            Some(false) => Err(ApiError::rejected(self.message)),
            _ => Ok(()),
        }
    }
}

/// Paginated list query for one entity type.
#[async_trait]
pub trait ListSource<R>: Send + Sync + 'static {
    async fn fetch(&self, request: ListRequest) -> Result<ListPage<R>, ApiError>;
}

/// Id-addressed row mutations. Toggle and delete are distinct calls.
#[async_trait]
pub trait RowMutations: Send + Sync + 'static {
    /// Ask the backend to move `id` to `target`.
    async fn toggle_status(&self, id: &RowId, target: RowStatus) -> Result<(), ApiError>;

    /// Permanently remove `id`.
    async fn delete(&self, id: &RowId) -> Result<(), ApiError>;
}
