//! JSON endpoints for the AI flows. Each one forwards the body to the named
//! flow and returns its structured output as-is.

use axum::{extract::State, Json};

use netram_llm::flows::{
    AnalyzeEyeImage, ConditionSuggestions, ConditionsInput, EyeImageAnalysis, EyeImageInput,
    GenerateLiteratureReviewSnippet, GenerateMedicalTopicSummary, LiteratureReviewInput,
    LiteratureReviewSnippet, RewriteInput, RewriteOutput, RewriteResearchArticle, SuggestConditions,
    SummarizeInput, SummarizeText, Summary, TopicInput, TopicSummary,
};

use crate::auth::AuthUser;
use crate::error::{ApiJson, ApiResult};
use crate::state::SharedState;

/// POST /api/ai/eye-scan
pub async fn eye_scan(
    State(state): State<SharedState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<EyeImageInput>,
) -> ApiResult<Json<EyeImageAnalysis>> {
    Ok(Json(state.flows.run::<AnalyzeEyeImage>(input).await?))
}

/// POST /api/ai/summarize
pub async fn summarize(
    State(state): State<SharedState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<SummarizeInput>,
) -> ApiResult<Json<Summary>> {
    Ok(Json(state.flows.run::<SummarizeText>(input).await?))
}

/// POST /api/ai/topic-summary
pub async fn topic_summary(
    State(state): State<SharedState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<TopicInput>,
) -> ApiResult<Json<TopicSummary>> {
    Ok(Json(state.flows.run::<GenerateMedicalTopicSummary>(input).await?))
}

/// POST /api/ai/rewrite
pub async fn rewrite(
    State(state): State<SharedState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<RewriteInput>,
) -> ApiResult<Json<RewriteOutput>> {
    Ok(Json(state.flows.run::<RewriteResearchArticle>(input).await?))
}

/// POST /api/ai/literature-review
pub async fn literature_review(
    State(state): State<SharedState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<LiteratureReviewInput>,
) -> ApiResult<Json<LiteratureReviewSnippet>> {
    Ok(Json(state.flows.run::<GenerateLiteratureReviewSnippet>(input).await?))
}

/// POST /api/ai/suggest-conditions
pub async fn suggest_conditions(
    State(state): State<SharedState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<ConditionsInput>,
) -> ApiResult<Json<ConditionSuggestions>> {
    Ok(Json(state.flows.run::<SuggestConditions>(input).await?))
}
