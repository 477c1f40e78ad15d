use crate::{entity::member, json_err, utils, AppState};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MemberForm {
    pub name: String,
    pub gender: String,
    pub age_group: String,
    #[serde(default)]
    pub contact: Option<String>,
}

pub async fn list_members(State(state): State<AppState>) -> (StatusCode, Response) {
    match list(&state.db).await {
        Ok(members) => (StatusCode::OK, Json(members).into_response()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json_err!("failed to list members: {e}"),
        ),
    }
}

pub async fn register_member(
    State(state): State<AppState>,
    Json(form): Json<MemberForm>,
) -> (StatusCode, Response) {
    if form.name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, json_err!("name is required"));
    }
    match register(&state.db, form, utils::today()).await {
        Ok(member) => {
            log::info!("registered member {} ({})", member.name, member.member_id);
            (StatusCode::OK, Json(member).into_response())
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json_err!("failed to register member: {e}"),
        ),
    }
}

pub async fn list(db: &DatabaseConnection) -> Result<Vec<member::Model>> {
    Ok(member::Entity::find()
        .order_by_asc(member::Column::Name)
        .all(db)
        .await?)
}

pub async fn register(
    db: &DatabaseConnection,
    form: MemberForm,
    joined: NaiveDate,
) -> Result<member::Model> {
    let contact = form
        .contact
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let member = member::ActiveModel {
        member_id: Set(member_code()),
        name: Set(form.name.trim().to_string()),
        gender: Set(form.gender),
        age_group: Set(form.age_group),
        contact: Set(contact),
        join_date: Set(joined),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(member)
}

/// First 8 hex digits of a random UUID.
fn member_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
