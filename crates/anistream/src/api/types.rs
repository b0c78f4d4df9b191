//! Upstream response shapes and their normalizers.
//!
//! The anime API is not uniform: a listing may come back as a bare array,
//! as `{"data": [...]}`, or (for search) as
//! `{"data": [{"result": [...], "pagination": {...}}]}`. Each shape is one
//! variant of [`ListPayload`]; the per-endpoint normalizers below turn any of
//! them into a plain list.

use super::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::{AnimeDetail, Episode, Pagination, SearchPage, SearchResult};

/// One search envelope inside the nested search shape
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct SearchEnvelope<T> {
    pub result: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Every list shape the upstream API is known to produce
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged, bound = "T: DeserializeOwned")]
pub enum ListPayload<T> {
    /// `[...]`
    Bare(Vec<T>),
    /// `{"data": [{"result": [...], "pagination": {...}}]}`
    Nested { data: Vec<SearchEnvelope<T>> },
    /// `{"data": [...]}`
    Wrapped { data: Vec<T> },
}

impl<T: DeserializeOwned> ListPayload<T> {
    /// Parse a response body into one of the known shapes
    pub fn parse(body: &str) -> ApiResult<Self> {
        serde_json::from_str(body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }

    /// Flatten to a plain list, whatever the shape
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListPayload::Bare(items) | ListPayload::Wrapped { data: items } => items,
            ListPayload::Nested { data } => data.into_iter().flat_map(|env| env.result).collect(),
        }
    }

    /// Pagination metadata, only carried by the nested shape
    pub fn pagination(&self) -> Option<&Pagination> {
        match self {
            ListPayload::Nested { data } => data.first().and_then(|env| env.pagination.as_ref()),
            _ => None,
        }
    }
}

/// Normalize a plain listing body (latest, recommended, movies)
pub fn normalize_list<T: DeserializeOwned>(body: &str) -> ApiResult<Vec<T>> {
    Ok(ListPayload::<T>::parse(body)?.into_items())
}

/// Normalize a search body into results plus pagination
pub fn normalize_search(body: &str) -> ApiResult<SearchPage> {
    let payload = ListPayload::<SearchResult>::parse(body)?;
    let pagination = payload.pagination().cloned();
    Ok(SearchPage {
        results: payload.into_items(),
        pagination,
    })
}

/// Normalize a detail body; `None` when the payload carries no record
pub fn normalize_detail(body: &str) -> ApiResult<Option<AnimeDetail>> {
    Ok(normalize_list::<AnimeDetail>(body)?.into_iter().next())
}

/// Normalize a video body; `None` when the payload carries no episode
pub fn normalize_video(body: &str) -> ApiResult<Option<Episode>> {
    Ok(normalize_list::<Episode>(body)?.into_iter().next())
}
