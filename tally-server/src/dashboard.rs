use std::collections::BTreeMap;

use crate::{attendance, json_err, offering, utils, AppState};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tally_common::ServiceType;

/// Counter values the dashboard page renders before live updates arrive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ServiceTotals {
    pub attendance: i64,
    pub offering: f64,
    pub monthly_attendance: i64,
    pub monthly_offering: f64,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    /// e.g. `October 18, 2026`
    pub date: String,
    pub month: String,
    pub services: BTreeMap<ServiceType, ServiceTotals>,
}

pub async fn get_dashboard(State(state): State<AppState>) -> (StatusCode, Response) {
    match summary(&state.db, utils::today()).await {
        Ok(summary) => (StatusCode::OK, Json(summary).into_response()),
        Err(e) => {
            log::error!("failed to build dashboard: {e:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_err!("failed to build dashboard: {e}"),
            )
        }
    }
}

pub async fn summary(db: &DatabaseConnection, date: NaiveDate) -> Result<Summary> {
    let mut services = BTreeMap::new();
    for service in ServiceType::ALL {
        services.insert(
            service,
            ServiceTotals {
                attendance: attendance::day_total(db, date, service).await?,
                offering: utils::round2(offering::day_total(db, date, service).await?),
                monthly_attendance: attendance::month_total(db, date, service).await?,
                monthly_offering: utils::round2(offering::month_total(db, date, service).await?),
            },
        );
    }
    Ok(Summary {
        date: utils::long_date(date),
        month: utils::month_key(date),
        services,
    })
}
