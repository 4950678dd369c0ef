use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use log::{error, info};
use serde_json::json;

use crate::config::PROPERTY_UPLOADS_URL_PATH;
use crate::db;
use crate::error::ApiError;
use crate::filter::PropertyFilter;
use crate::images;
use crate::models::{NewProperty, Property, PropertyChangeset, PropertyResponse};
use crate::schema::properties::dsl::*;
use crate::AppState;

use super::{base_url, property_image_rule, read_form};

const MAX_PROPERTY_IMAGES: usize = 10;

/// Fetches all properties, newest first
pub async fn list_properties(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PropertyResponse>>, ApiError> {
    let mut conn = db::get_conn(&state.pool)?;

    info!("Fetching all properties");
    let records = properties
        .order_by(created_at.desc())
        .load::<Property>(&mut conn)
        .map_err(|e| {
            error!("Failed to fetch properties: {}", e);
            ApiError::internal("Error fetching properties. Please try again later.", e)
        })?;

    let base = base_url(&headers);
    Ok(Json(
        records
            .into_iter()
            .map(|p| PropertyResponse::from_record(p, &base))
            .collect(),
    ))
}

/// Fetches a single property by id
pub async fn get_property(
    State(state): State<AppState>,
    Path(property_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<PropertyResponse>, ApiError> {
    let mut conn = db::get_conn(&state.pool)?;

    let record = properties
        .find(property_id)
        .first::<Property>(&mut conn)
        .optional()
        .map_err(|e| {
            error!("Failed to fetch property {}: {}", property_id, e);
            ApiError::internal("Error fetching property. Please try again later.", e)
        })?
        .ok_or(ApiError::NotFound("Property not found"))?;

    Ok(Json(PropertyResponse::from_record(record, &base_url(&headers))))
}

/// Up to 8 featured properties, newest first
pub async fn featured_properties(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = db::get_conn(&state.pool)?;

    let records = properties
        .filter(is_featured.eq(true))
        .order_by(created_at.desc())
        .limit(8)
        .load::<Property>(&mut conn)
        .map_err(|e| {
            error!("Failed to fetch featured properties: {}", e);
            ApiError::internal("Error fetching featured properties. Please try again later.", e)
        })?;

    let base = base_url(&headers);
    let formatted: Vec<PropertyResponse> = records
        .into_iter()
        .map(|p| PropertyResponse::from_record(p, &base))
        .collect();
    Ok(Json(json!({
        "count": formatted.len(),
        "featuredProperties": formatted,
    })))
}

/// Filtered search over properties; malformed filter values are dropped, not
/// rejected, and the response echoes what was actually applied.
pub async fn filter_properties(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(criteria): Json<PropertyFilter>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = db::get_conn(&state.pool)?;

    let records = crate::filter::build_query(&criteria)
        .load::<Property>(&mut conn)
        .map_err(|e| {
            error!("Failed to filter properties: {}", e);
            ApiError::internal("Error filtering properties. Please try again later.", e)
        })?;

    let base = base_url(&headers);
    let formatted: Vec<PropertyResponse> = records
        .into_iter()
        .map(|p| PropertyResponse::from_record(p, &base))
        .collect();
    Ok(Json(json!({
        "count": formatted.len(),
        "properties": formatted,
        "filters_applied": criteria.applied(),
    })))
}

/// Creates a property from a multipart form; uploaded images are stored on
/// disk and their relative paths serialized into the record.
pub async fn create_property(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let form = read_form(&mut multipart, "images", MAX_PROPERTY_IMAGES, property_image_rule).await?;
    info!("Image files uploaded: {}", form.uploads.len());

    let upload_dir = state.config.property_uploads_dir();
    let image_paths = images::store_uploads(&upload_dir, PROPERTY_UPLOADS_URL_PATH, "property", &form.uploads)
        .map_err(|e| {
            error!("Failed to store uploaded images: {}", e);
            ApiError::internal("Error adding property. Please try again later.", e)
        })?;
    info!("Image paths: {:?}", image_paths);

    let now = Utc::now().naive_utc();
    let new_property = NewProperty {
        title: form.text("title"),
        description: form.text("description"),
        category: form.text("category"),
        sub_category: form.text("sub_category"),
        status: form.text("status"),
        price: form.text("price").trim().parse().unwrap_or(0.0),
        size: form.text("size").trim().parse().unwrap_or(0.0),
        location: form.text("location"),
        bedroom: form.text("bedroom"),
        bathroom: form.text("bathroom").trim().parse().unwrap_or(0),
        view: form.text("view"),
        parking: form.text("parking"),
        agent_id: form.text("agentId").trim().parse().ok(),
        is_featured: form.text("is_featured") == "true",
        images: Some(images::serialize_paths(&image_paths)),
        amenities: form.non_empty("amenities"),
        created_at: now,
        updated_at: now,
    };

    let mut conn = db::get_conn(&state.pool)?;
    let record: Property = diesel::insert_into(properties)
        .values(&new_property)
        .get_result(&mut conn)
        .map_err(|e| {
            error!("Failed to insert property: {}", e);
            ApiError::internal("Error adding property. Please try again later.", e)
        })?;

    let base = base_url(&headers);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Property added successfully",
            "propertyId": record.id,
            "property": PropertyResponse::from_record(record, &base),
        })),
    ))
}

/// Updates a property, reconciling its image set: stored images the caller no
/// longer lists are deleted from disk, new uploads are appended after the
/// retained ones.
pub async fn update_property(
    State(state): State<AppState>,
    Path(property_id): Path<i32>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = read_form(&mut multipart, "images", MAX_PROPERTY_IMAGES, property_image_rule).await?;

    let mut conn = db::get_conn(&state.pool)?;
    let current = properties
        .find(property_id)
        .first::<Property>(&mut conn)
        .optional()
        .map_err(|e| {
            error!("Failed to fetch property {}: {}", property_id, e);
            ApiError::internal("Error updating property. Please try again later.", e)
        })?
        .ok_or(ApiError::NotFound("Property not found"))?;

    let current_paths = images::parse_stored(current.images.as_deref());

    // Retained images may arrive as full URLs; normalize back to relative
    // paths before diffing against the stored list.
    let retained: Vec<String> = form
        .non_empty("existingImages")
        .map(|raw| images::RawPathList::Text(raw).normalize())
        .unwrap_or_default()
        .into_iter()
        .map(|p| images::strip_host(&p))
        .collect();

    let upload_dir = state.config.property_uploads_dir();
    images::reconcile(&upload_dir, &current_paths, &retained);

    let new_paths = images::store_uploads(&upload_dir, PROPERTY_UPLOADS_URL_PATH, "property", &form.uploads)
        .map_err(|e| {
            error!("Failed to store uploaded images: {}", e);
            ApiError::internal("Error updating property. Please try again later.", e)
        })?;

    let mut final_paths = retained;
    final_paths.extend(new_paths);
    info!("Final image paths to store: {:?}", final_paths);

    let changeset = PropertyChangeset {
        title: form.text("title"),
        description: form.text("description"),
        category: form.text("category"),
        sub_category: form.text("sub_category"),
        status: form.text("status"),
        price: form.text("price").trim().parse().unwrap_or(0.0),
        size: form.text("size").trim().parse().unwrap_or(0.0),
        location: form.text("location"),
        bedroom: form.text("bedroom"),
        bathroom: form.text("bathroom").trim().parse().unwrap_or(0),
        view: form.text("view"),
        parking: form.text("parking"),
        agent_id: form.text("agentId").trim().parse().ok(),
        is_featured: form.text("is_featured") == "true",
        images: Some(images::serialize_paths(&final_paths)),
        amenities: form.non_empty("amenities"),
        updated_at: Utc::now().naive_utc(),
    };

    let updated: Property = diesel::update(properties.find(property_id))
        .set(&changeset)
        .get_result(&mut conn)
        .map_err(|e| {
            error!("Failed to update property {}: {}", property_id, e);
            ApiError::internal("Error updating property. Please try again later.", e)
        })?;

    let base = base_url(&headers);
    Ok(Json(json!({
        "message": "Property updated successfully",
        "property": PropertyResponse::from_record(updated, &base),
    })))
}

/// Deletes a property, then removes its image files best-effort: a missing
/// file never resurrects the record.
pub async fn delete_property(
    State(state): State<AppState>,
    Path(property_id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = db::get_conn(&state.pool)?;
    let existing = properties
        .find(property_id)
        .first::<Property>(&mut conn)
        .optional()
        .map_err(|e| {
            error!("Failed to fetch property {}: {}", property_id, e);
            ApiError::internal("Error deleting property. Please try again later.", e)
        })?
        .ok_or(ApiError::NotFound("Property not found"))?;

    diesel::delete(properties.find(property_id))
        .execute(&mut conn)
        .map_err(|e| {
            error!("Failed to delete property {}: {}", property_id, e);
            ApiError::internal("Error deleting property. Please try again later.", e)
        })?;

    let stored = images::parse_stored(existing.images.as_deref());
    images::remove_all(&state.config.property_uploads_dir(), &stored);

    Ok(Json(json!({
        "message": "Property deleted successfully",
        "id": property_id,
    })))
}
