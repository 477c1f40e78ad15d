use crate::{
    entity::{contribution, fund, member},
    json_err, utils, AppState,
};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tally_common::{PushEvent, ServiceType};

#[derive(Debug, Deserialize)]
pub struct FundForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContributionForm {
    pub fund_id: i32,
    pub service_type: String,
    pub amount: f64,
    #[serde(default)]
    pub member_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ContributionEntry {
    #[serde(flatten)]
    pub contribution: contribution::Model,
    pub fund_name: Option<String>,
}

pub async fn list_funds(State(state): State<AppState>) -> (StatusCode, Response) {
    let funds = fund::Entity::find()
        .order_by_asc(fund::Column::Name)
        .all(&state.db)
        .await;
    match funds {
        Ok(funds) => (StatusCode::OK, Json(funds).into_response()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json_err!("failed to list funds: {e}"),
        ),
    }
}

pub async fn create_fund(
    State(state): State<AppState>,
    Json(form): Json<FundForm>,
) -> (StatusCode, Response) {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, json_err!("name is required"));
    }
    let created = match create(&state.db, &name, form.description, utils::today()).await {
        Ok(Some(fund)) => fund,
        Ok(None) => {
            return (
                StatusCode::CONFLICT,
                json_err!("fund `{name}` already exists"),
            )
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_err!("failed to create fund: {e}"),
            )
        }
    };

    state
        .hub
        .publish(PushEvent::FundUpdate {
            action: "created".to_string(),
            name: created.name.clone(),
        })
        .await;
    log::info!("created fund `{}`", created.name);
    (StatusCode::OK, Json(created).into_response())
}

pub async fn list_contributions(State(state): State<AppState>) -> (StatusCode, Response) {
    match contributions(&state.db).await {
        Ok(entries) => (StatusCode::OK, Json(entries).into_response()),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json_err!("failed to list contributions: {e}"),
        ),
    }
}

pub async fn record_contribution(
    State(state): State<AppState>,
    Json(form): Json<ContributionForm>,
) -> (StatusCode, Response) {
    let service = match utils::parse_service(&form.service_type) {
        Ok(s) => s,
        Err(resp) => return (StatusCode::BAD_REQUEST, resp),
    };
    if !form.amount.is_finite() {
        return (StatusCode::BAD_REQUEST, json_err!("amount must be a number"));
    }

    let recorded = record(
        &state.db,
        form.fund_id,
        form.member_id,
        utils::today(),
        service,
        form.amount,
    )
    .await;
    let (fund, total) = match recorded {
        Ok(Recorded::Saved { fund, total }) => (fund, utils::round2(total)),
        Ok(Recorded::NoFund) => {
            return (
                StatusCode::NOT_FOUND,
                json_err!("fund {} not found", form.fund_id),
            )
        }
        Ok(Recorded::NoMember) => {
            return (
                StatusCode::NOT_FOUND,
                json_err!("member {} not found", form.member_id.unwrap_or_default()),
            )
        }
        Err(e) => {
            log::error!("failed to record contribution: {e:?}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_err!("failed to record contribution: {e}"),
            );
        }
    };

    state
        .hub
        .publish(PushEvent::ContributionUpdate {
            fund: fund.name.clone(),
            total,
        })
        .await;
    log::info!("contribution to `{}` saved, total {total:.2}", fund.name);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": format!("contribution to {} saved", fund.name),
            "fund": fund.name,
            "total": total,
        }))
        .into_response(),
    )
}

/// Insert a fund unless one with the same name exists.
pub async fn create(
    db: &DatabaseConnection,
    name: &str,
    description: Option<String>,
    created: NaiveDate,
) -> Result<Option<fund::Model>> {
    let fund = fund::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.filter(|d| !d.trim().is_empty())),
        created_date: Set(created),
        ..Default::default()
    };
    let inserted = fund::Entity::insert(fund)
        .on_conflict(OnConflict::column(fund::Column::Name).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;
    if inserted == 0 {
        return Ok(None);
    }
    let fund = fund::Entity::find()
        .filter(fund::Column::Name.eq(name))
        .one(db)
        .await?
        .with_context(|| format!("fund `{name}` vanished after insert"))?;
    Ok(Some(fund))
}

pub enum Recorded {
    Saved { fund: fund::Model, total: f64 },
    NoFund,
    NoMember,
}

pub async fn record(
    db: &DatabaseConnection,
    fund_id: i32,
    member_id: Option<i32>,
    date: NaiveDate,
    service: ServiceType,
    amount: f64,
) -> Result<Recorded> {
    let Some(fund) = fund::Entity::find_by_id(fund_id).one(db).await? else {
        return Ok(Recorded::NoFund);
    };
    if let Some(id) = member_id {
        if member::Entity::find_by_id(id).one(db).await?.is_none() {
            return Ok(Recorded::NoMember);
        }
    }

    contribution::ActiveModel {
        fund_id: Set(fund.id),
        service_date: Set(date),
        service_type: Set(service.to_string()),
        amount: Set(amount),
        member_id: Set(member_id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let total = fund_total(db, fund.id).await?;
    Ok(Recorded::Saved { fund, total })
}

pub async fn fund_total(db: &DatabaseConnection, fund_id: i32) -> Result<f64> {
    let rows = contribution::Entity::find()
        .filter(contribution::Column::FundId.eq(fund_id))
        .all(db)
        .await?;
    Ok(rows.iter().map(|c| c.amount).sum())
}

/// Newest first, with the fund name attached.
pub async fn contributions(db: &DatabaseConnection) -> Result<Vec<ContributionEntry>> {
    let rows = contribution::Entity::find()
        .find_also_related(fund::Entity)
        .order_by_desc(contribution::Column::ServiceDate)
        .order_by_desc(contribution::Column::Id)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(contribution, fund)| ContributionEntry {
            contribution,
            fund_name: fund.map(|f| f.name),
        })
        .collect())
}
