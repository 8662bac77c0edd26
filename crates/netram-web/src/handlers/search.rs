//! Medical knowledge search across Wikipedia, PubMed and MedlinePlus.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use netram_search::{SearchResultItem, SourceSelector};

use crate::error::{ApiError, ApiQuery, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
}

/// GET /api/medical-search?query=&source=all|wikipedia|pubmed|medlineplus
pub async fn medical_search(
    State(state): State<SharedState>,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let query = q.query.as_deref().map(str::trim).filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter is required".into()))?;
    let source: SourceSelector = q.source.as_deref().unwrap_or_default()
        .parse()
        .map_err(ApiError::BadRequest)?;

    let results = state.search.search(query, source).await;
    Ok(Json(SearchResponse { results: results.as_ref().clone() }))
}
