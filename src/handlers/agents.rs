use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use diesel::prelude::*;
use log::{error, info};
use serde_json::json;

use crate::config::AGENT_UPLOADS_URL_PATH;
use crate::db;
use crate::error::ApiError;
use crate::images;
use crate::models::{Agent, AgentResponse, NewAgent};
use crate::schema::agents::dsl::*;
use crate::AppState;

use super::{agent_image_rule, base_url, read_form};

pub async fn list_agents(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<AgentResponse>>, ApiError> {
    let mut conn = db::get_conn(&state.pool)?;

    let records = agents.load::<Agent>(&mut conn).map_err(|e| {
        error!("Failed to fetch agents: {}", e);
        ApiError::internal("Failed to retrieve agents", e)
    })?;

    let base = base_url(&headers);
    Ok(Json(
        records
            .into_iter()
            .map(|a| AgentResponse::from_record(a, &base))
            .collect(),
    ))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_record_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<AgentResponse>, ApiError> {
    let mut conn = db::get_conn(&state.pool)?;

    let record = agents
        .find(agent_record_id)
        .first::<Agent>(&mut conn)
        .optional()
        .map_err(|e| {
            error!("Failed to fetch agent {}: {}", agent_record_id, e);
            ApiError::internal("Failed to retrieve agents", e)
        })?
        .ok_or(ApiError::NotFound("Agent not found"))?;

    Ok(Json(AgentResponse::from_record(record, &base_url(&headers))))
}

/// Creates an agent; the optional single `image` upload is stored and its
/// relative path recorded.
pub async fn create_agent(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let form = read_form(&mut multipart, "image", 1, agent_image_rule).await?;

    let agent_name = form.non_empty("name");
    let mobile = form.non_empty("mobile_number");
    let (agent_name, mobile) = match (agent_name, mobile) {
        (Some(n), Some(m)) => (n, m),
        _ => {
            return Err(ApiError::BadRequest(
                "Name and mobile number are required".to_string(),
            ))
        }
    };

    let image_path = if form.uploads.is_empty() {
        None
    } else {
        images::store_uploads(
            &state.config.agent_uploads_dir(),
            AGENT_UPLOADS_URL_PATH,
            "agent",
            &form.uploads,
        )
        .map_err(|e| {
            error!("Failed to store agent image: {}", e);
            ApiError::internal("Failed to add agent", e)
        })?
        .pop()
    };

    let new_agent = NewAgent {
        name: agent_name,
        image: image_path,
        mobile_number: mobile,
    };

    let mut conn = db::get_conn(&state.pool)?;
    let record: Agent = diesel::insert_into(agents)
        .values(&new_agent)
        .get_result(&mut conn)
        .map_err(|e| {
            error!("Failed to insert agent: {}", e);
            ApiError::internal("Failed to add agent", e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Agent added successfully",
            "agent_id": record.id,
        })),
    ))
}

/// Updates an agent. A new upload replaces the stored image and deletes the
/// prior file; blank name/mobile fields fall back to stored values.
pub async fn update_agent(
    State(state): State<AppState>,
    Path(agent_record_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = read_form(&mut multipart, "image", 1, agent_image_rule).await?;

    let mut conn = db::get_conn(&state.pool)?;
    let existing = agents
        .find(agent_record_id)
        .first::<Agent>(&mut conn)
        .optional()
        .map_err(|e| {
            error!("Failed to fetch agent {}: {}", agent_record_id, e);
            ApiError::internal("Failed to update agent", e)
        })?
        .ok_or(ApiError::NotFound("Agent not found"))?;

    let upload_dir = state.config.agent_uploads_dir();
    let image_path = if form.uploads.is_empty() {
        existing.image.clone()
    } else {
        if let Some(old) = &existing.image {
            images::remove_file_quietly(&upload_dir, old);
        }
        images::store_uploads(&upload_dir, AGENT_UPLOADS_URL_PATH, "agent", &form.uploads)
            .map_err(|e| {
                error!("Failed to store agent image: {}", e);
                ApiError::internal("Failed to update agent", e)
            })?
            .pop()
    };

    diesel::update(agents.find(agent_record_id))
        .set((
            name.eq(form.non_empty("name").unwrap_or(existing.name)),
            image.eq(image_path),
            mobile_number.eq(form.non_empty("mobile_number").unwrap_or(existing.mobile_number)),
        ))
        .execute(&mut conn)
        .map_err(|e| {
            error!("Failed to update agent {}: {}", agent_record_id, e);
            ApiError::internal("Failed to update agent", e)
        })?;

    Ok(Json(json!({
        "message": "Agent updated successfully",
        "agent_id": agent_record_id,
    })))
}

/// Deletes an agent and its image file; file removal is best-effort.
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(agent_record_id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = db::get_conn(&state.pool)?;
    let existing = agents
        .find(agent_record_id)
        .first::<Agent>(&mut conn)
        .optional()
        .map_err(|e| {
            error!("Failed to fetch agent {}: {}", agent_record_id, e);
            ApiError::internal("Failed to delete agent", e)
        })?
        .ok_or(ApiError::NotFound("Agent not found"))?;

    if let Some(path) = &existing.image {
        images::remove_file_quietly(&state.config.agent_uploads_dir(), path);
    }

    let deleted = diesel::delete(agents.find(agent_record_id))
        .execute(&mut conn)
        .map_err(|e| {
            error!("Failed to delete agent {}: {}", agent_record_id, e);
            ApiError::internal("Failed to delete agent", e)
        })?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Agent not found or already deleted"));
    }

    info!("Deleted agent {}", agent_record_id);
    Ok(Json(json!({
        "message": "Agent deleted successfully",
        "agent_id": agent_record_id,
    })))
}
