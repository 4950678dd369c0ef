use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::images;

#[derive(Debug, Serialize, Deserialize, Queryable)]
#[diesel(table_name = crate::schema::properties)]
pub struct Property {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub sub_category: String,
    pub status: String,
    pub price: f64,
    pub size: f64,
    pub location: String,
    pub bedroom: String,          // blank-allowed text
    pub bathroom: i32,
    pub view: String,
    pub parking: String,
    pub agent_id: Option<i32>,
    pub is_featured: bool,
    pub images: Option<String>,   // JSON array of relative paths
    pub amenities: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize, Insertable, Clone)]
#[diesel(table_name = crate::schema::properties)]
pub struct NewProperty {
    pub title: String,
    pub description: String,
    pub category: String,
    pub sub_category: String,
    pub status: String,
    pub price: f64,
    pub size: f64,
    pub location: String,
    pub bedroom: String,
    pub bathroom: i32,
    pub view: String,
    pub parking: String,
    pub agent_id: Option<i32>,
    pub is_featured: bool,
    pub images: Option<String>,
    pub amenities: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Full-row update: every column is written, NULL included, which is why
/// `treat_none_as_null` is set.
#[derive(Debug, AsChangeset, Clone)]
#[diesel(table_name = crate::schema::properties, treat_none_as_null = true)]
pub struct PropertyChangeset {
    pub title: String,
    pub description: String,
    pub category: String,
    pub sub_category: String,
    pub status: String,
    pub price: f64,
    pub size: f64,
    pub location: String,
    pub bedroom: String,
    pub bathroom: i32,
    pub view: String,
    pub parking: String,
    pub agent_id: Option<i32>,
    pub is_featured: bool,
    pub images: Option<String>,
    pub amenities: Option<String>,
    pub updated_at: NaiveDateTime,
}

/// Property as returned to callers: stored relative image paths replaced by
/// absolute URLs built from the current request's scheme and host.
#[derive(Debug, Serialize)]
pub struct PropertyResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub sub_category: String,
    pub status: String,
    pub price: f64,
    pub size: f64,
    pub location: String,
    pub bedroom: String,
    pub bathroom: i32,
    pub view: String,
    pub parking: String,
    pub agent_id: Option<i32>,
    pub is_featured: bool,
    pub images: Vec<String>,
    pub amenities: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PropertyResponse {
    pub fn from_record(p: Property, base_url: &str) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            category: p.category,
            sub_category: p.sub_category,
            status: p.status,
            price: p.price,
            size: p.size,
            location: p.location,
            bedroom: p.bedroom,
            bathroom: p.bathroom,
            view: p.view,
            parking: p.parking,
            agent_id: p.agent_id,
            is_featured: p.is_featured,
            images: images::format_image_urls(p.images.as_deref(), base_url),
            amenities: p.amenities,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Queryable)]
#[diesel(table_name = crate::schema::agents)]
pub struct Agent {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,    // single relative path
    pub mobile_number: String,
}

#[derive(Debug, Serialize, Deserialize, Insertable, Clone)]
#[diesel(table_name = crate::schema::agents)]
pub struct NewAgent {
    pub name: String,
    pub image: Option<String>,
    pub mobile_number: String,
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub mobile_number: String,
}

impl AgentResponse {
    pub fn from_record(a: Agent, base_url: &str) -> Self {
        Self {
            id: a.id,
            name: a.name,
            image: a.image.map(|path| images::absolute_url(&path, base_url)),
            mobile_number: a.mobile_number,
        }
    }
}
