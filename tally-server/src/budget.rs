use std::collections::BTreeMap;

use crate::{attendance, entity::monthly_budget, json_err, json_msg, offering, utils, AppState};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tally_common::ServiceType;

/// Monthly targets for one service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub target_attendance: i32,
    pub target_offering: f64,
}

impl Target {
    fn is_valid(&self) -> bool {
        self.target_attendance >= 0 && self.target_offering.is_finite() && self.target_offering >= 0.0
    }
}

pub type Targets = BTreeMap<ServiceType, Target>;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ServiceReport {
    pub att_actual: i64,
    pub att_target: i32,
    pub off_actual: f64,
    pub off_target: f64,
}

pub async fn get_budget(State(state): State<AppState>) -> (StatusCode, Response) {
    let month = utils::month_key(utils::today());
    match targets(&state.db, &month).await {
        Ok(targets) => (
            StatusCode::OK,
            Json(serde_json::json!({"month": month, "targets": targets})).into_response(),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json_err!("failed to load budget: {e}"),
        ),
    }
}

pub async fn set_budget(
    State(state): State<AppState>,
    Json(targets): Json<Targets>,
) -> (StatusCode, Response) {
    if let Some((service, _)) = targets.iter().find(|(_, t)| !t.is_valid()) {
        return (
            StatusCode::BAD_REQUEST,
            json_err!("{service} targets must be non-negative numbers"),
        );
    }
    let month = utils::month_key(utils::today());
    match save(&state.db, &month, &targets).await {
        Ok(()) => {
            log::info!("budget for {month} saved");
            (StatusCode::OK, json_msg!("budget for {month} saved"))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json_err!("failed to save budget: {e}"),
        ),
    }
}

pub async fn monthly_report(State(state): State<AppState>) -> (StatusCode, Response) {
    let today = utils::today();
    match report(&state.db, today).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "month": utils::month_key(today),
                "services": report,
            }))
            .into_response(),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json_err!("failed to build report: {e}"),
        ),
    }
}

/// Targets for `month` (`YYYY-MM`), zero for services without any.
pub async fn targets(db: &DatabaseConnection, month: &str) -> Result<Targets> {
    let mut targets: Targets = ServiceType::ALL
        .into_iter()
        .map(|s| (s, Target::default()))
        .collect();
    let rows = monthly_budget::Entity::find()
        .filter(monthly_budget::Column::MonthYear.eq(month))
        .all(db)
        .await?;
    for row in rows {
        let Ok(service) = row.service_type.parse::<ServiceType>() else {
            log::warn!("ignoring budget row for unknown service `{}`", row.service_type);
            continue;
        };
        targets.insert(
            service,
            Target {
                target_attendance: row.target_attendance,
                target_offering: row.target_offering,
            },
        );
    }
    Ok(targets)
}

pub async fn save(db: &DatabaseConnection, month: &str, targets: &Targets) -> Result<()> {
    for (service, target) in targets {
        let row = monthly_budget::ActiveModel {
            month_year: Set(month.to_string()),
            service_type: Set(service.to_string()),
            target_attendance: Set(target.target_attendance),
            target_offering: Set(target.target_offering),
            ..Default::default()
        };
        monthly_budget::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([
                    monthly_budget::Column::MonthYear,
                    monthly_budget::Column::ServiceType,
                ])
                .update_columns([
                    monthly_budget::Column::TargetAttendance,
                    monthly_budget::Column::TargetOffering,
                ])
                .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

/// Actuals against targets for the month containing `date`.
pub async fn report(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<BTreeMap<ServiceType, ServiceReport>> {
    let targets = targets(db, &utils::month_key(date)).await?;
    let mut report = BTreeMap::new();
    for service in ServiceType::ALL {
        let target = targets.get(&service).copied().unwrap_or_default();
        report.insert(
            service,
            ServiceReport {
                att_actual: attendance::month_total(db, date, service).await?,
                att_target: target.target_attendance,
                off_actual: utils::round2(offering::month_total(db, date, service).await?),
                off_target: target.target_offering,
            },
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_unset_targets_are_zero() {
        let db = db::memory().await;
        let targets = targets(&db, "2025-11").await.unwrap();
        assert_eq!(targets.len(), 3);
        assert!(targets.values().all(|t| *t == Target::default()));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let db = db::memory().await;
        let mut wanted = Targets::new();
        wanted.insert(
            ServiceType::Sunday,
            Target {
                target_attendance: 300,
                target_offering: 5000.0,
            },
        );
        save(&db, "2025-11", &wanted).await.unwrap();
        wanted.get_mut(&ServiceType::Sunday).unwrap().target_attendance = 350;
        save(&db, "2025-11", &wanted).await.unwrap();

        let targets = targets(&db, "2025-11").await.unwrap();
        assert_eq!(targets[&ServiceType::Sunday].target_attendance, 350);
        assert_eq!(targets[&ServiceType::Monday], Target::default());
        assert_eq!(monthly_budget::Entity::find().all(&db).await.unwrap().len(), 1);

        // other months are untouched
        let december = super::targets(&db, "2025-12").await.unwrap();
        assert_eq!(december[&ServiceType::Sunday], Target::default());
    }

    #[tokio::test]
    async fn test_report() {
        let db = db::memory().await;
        let day = NaiveDate::from_ymd_opt(2025, 11, 2).unwrap();
        attendance::record(
            &db,
            day,
            ServiceType::Sunday,
            &attendance::Counts {
                adults_men: 40,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        offering::record(
            &db,
            day,
            ServiceType::Sunday,
            crate::entity::offering::Column::FirstOffering,
            120.5,
        )
        .await
        .unwrap();
        let mut wanted = Targets::new();
        wanted.insert(
            ServiceType::Sunday,
            Target {
                target_attendance: 100,
                target_offering: 1000.0,
            },
        );
        save(&db, "2025-11", &wanted).await.unwrap();

        let report = report(&db, day).await.unwrap();
        assert_eq!(
            report[&ServiceType::Sunday],
            ServiceReport {
                att_actual: 40,
                att_target: 100,
                off_actual: 120.5,
                off_target: 1000.0,
            }
        );
        assert_eq!(report[&ServiceType::Thursday].att_actual, 0);
    }

    #[test]
    fn test_targets_body() {
        let body = r#"{"Sunday": {"target_attendance": 10}, "Monday": {"target_offering": 2.5}}"#;
        let targets: Targets = serde_json::from_str(body).unwrap();
        assert_eq!(targets[&ServiceType::Sunday].target_attendance, 10);
        assert_eq!(targets[&ServiceType::Monday].target_offering, 2.5);
        assert!(!targets.contains_key(&ServiceType::Thursday));
    }
}
