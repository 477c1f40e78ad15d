use crate::{entity::offering, json_err, utils, AppState};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tally_common::{PushEvent, ServiceType, UpdateEvent};

#[derive(Debug, Deserialize)]
pub struct OfferingForm {
    pub service_type: String,
    pub amount: f64,
    /// `first` or `second`; only Sunday keeps them apart
    #[serde(default)]
    pub offering_type: Option<String>,
}

/// Column an offering is added to.
fn column(service: ServiceType, offering_type: Option<&str>) -> offering::Column {
    match (service, offering_type) {
        (ServiceType::Sunday, Some("first")) => offering::Column::FirstOffering,
        (ServiceType::Sunday, _) => offering::Column::SecondOffering,
        _ => offering::Column::FirstOffering,
    }
}

pub async fn post_offering(
    State(state): State<AppState>,
    Json(form): Json<OfferingForm>,
) -> (StatusCode, Response) {
    let service = match utils::parse_service(&form.service_type) {
        Ok(s) => s,
        Err(resp) => return (StatusCode::BAD_REQUEST, resp),
    };
    if !form.amount.is_finite() {
        return (StatusCode::BAD_REQUEST, json_err!("amount must be a number"));
    }

    let date = utils::today();
    let col = column(service, form.offering_type.as_deref());
    let (day, month) = match record(&state.db, date, service, col, form.amount).await {
        Ok(totals) => totals,
        Err(e) => {
            log::error!("failed to record {service} offering: {e:?}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_err!("failed to record offering: {e}"),
            );
        }
    };
    let (day, month) = (utils::round2(day), utils::round2(month));

    let name = service.as_str();
    state
        .hub
        .publish(PushEvent::OfferingUpdate(UpdateEvent::new(name, day)))
        .await;
    state
        .hub
        .publish(PushEvent::MonthlyOffUpdate(UpdateEvent::new(name, month)))
        .await;

    log::info!("{service} offering saved, total {day:.2}");
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": format!("{service} offering saved"),
            "service": name,
            "total": day,
            "monthly_total": month,
        }))
        .into_response(),
    )
}

/// Add `amount` to `col` of the day's row, creating the row on first use.
/// Returns the day and month totals for the service.
pub async fn record(
    db: &DatabaseConnection,
    date: NaiveDate,
    service: ServiceType,
    col: offering::Column,
    amount: f64,
) -> Result<(f64, f64)> {
    let blank = offering::ActiveModel {
        service_date: Set(date),
        service_type: Set(service.to_string()),
        first_offering: Set(0.0),
        second_offering: Set(0.0),
        ..Default::default()
    };
    let txn = db.begin().await?;
    offering::Entity::insert(blank)
        .on_conflict(
            OnConflict::columns([offering::Column::ServiceDate, offering::Column::ServiceType])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    offering::Entity::update_many()
        .col_expr(col, Expr::col(col).add(amount))
        .filter(offering::Column::ServiceDate.eq(date))
        .filter(offering::Column::ServiceType.eq(service.as_str()))
        .exec(&txn)
        .await?;

    let day = day_total(&txn, date, service).await?;
    let month = month_total(&txn, date, service).await?;
    txn.commit().await?;
    Ok((day, month))
}

pub async fn day_total<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
    service: ServiceType,
) -> Result<f64> {
    let row = offering::Entity::find()
        .filter(offering::Column::ServiceDate.eq(date))
        .filter(offering::Column::ServiceType.eq(service.as_str()))
        .one(db)
        .await?;
    Ok(row.map_or(0.0, |rec| rec.total()))
}

pub async fn month_total<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
    service: ServiceType,
) -> Result<f64> {
    let (first, next) = utils::month_range(date);
    let rows = offering::Entity::find()
        .filter(offering::Column::ServiceType.eq(service.as_str()))
        .filter(offering::Column::ServiceDate.gte(first))
        .filter(offering::Column::ServiceDate.lt(next))
        .all(db)
        .await?;
    Ok(rows.iter().map(offering::Model::total).sum())
}
