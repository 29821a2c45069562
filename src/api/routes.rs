use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{Job, JobRequest};
use super::{Envelope, error::ApiError, extractors::AuthUser, state::AppState};

type Reply<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct VideoQuery {
    #[serde(default)]
    pub id: u64,
}

/// One job when a video id is given, otherwise every job of the caller
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum JobData {
    One(Job),
    Many(Vec<Job>),
}

fn request_body(payload: Result<Json<JobRequest>, JsonRejection>) -> Result<JobRequest, ApiError> {
    payload
        .map(|Json(req)| req)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e.body_text())))
}

pub async fn create_transcription(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> Reply<()> {
    let req = request_body(payload)?;
    let langs = req.validate_transcription()?;

    info!(video_id = req.id, user_id = auth.user_id, languages = ?langs, "Transcription requested");
    state.workflow.spawn_transcription(req.id, auth.user_id, req.setting_id, langs);

    Ok(Envelope::reply(StatusCode::CREATED, "Create transcription in process", None))
}

pub async fn create_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> Reply<()> {
    let req = request_body(payload)?;
    let lang = req.validate_summary()?;

    info!(video_id = req.id, user_id = auth.user_id, lang = %lang, "Summary requested");
    state.workflow.spawn_summary(req.id, auth.user_id, req.setting_id, lang);

    Ok(Envelope::reply(StatusCode::CREATED, "Create summary in process", None))
}

pub async fn stitch_subtitles(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<VideoQuery>,
) -> Reply<String> {
    let id = query.id;
    if id == 0 {
        return Err(ApiError::BadRequest("ID video not specified or invalid".to_string()));
    }

    let url = state
        .workflow
        .stitch_subtitles(id)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to stitch subtitles: {}", e)))?;

    Ok(Envelope::reply(StatusCode::CREATED, "Created stitch subtitles into video", Some(url)))
}

pub async fn get_data(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<VideoQuery>,
) -> Reply<JobData> {
    let data = if query.id == 0 {
        JobData::Many(state.workflow.jobs_for_user(auth.user_id).await?)
    } else {
        let job = state.workflow.job(query.id).await?.ok_or_else(|| {
            ApiError::NotFound(format!("Failed to get data: no job for video {}", query.id))
        })?;
        JobData::One(job)
    };

    Ok(Envelope::reply(StatusCode::OK, "Data AI", Some(data)))
}
