use crate::{entity::attendance, json_err, utils, AppState};
use anyhow::{Context, Result};
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
use serde::{Deserialize, Serialize};
use tally_common::{PushEvent, ServiceType, UpdateEvent};

/// Head counts per category. Missing categories count as zero.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Counts {
    pub adults_men: i32,
    pub adults_women: i32,
    pub youth_gents: i32,
    pub youth_ladies: i32,
    pub children_boys: i32,
    pub children_girls: i32,
    pub visitors_male: i32,
    pub visitors_female: i32,
}

impl Counts {
    fn fields(&self) -> [(&'static str, attendance::Column, i32); 8] {
        use attendance::Column as C;
        [
            ("adults_men", C::AdultsMen, self.adults_men),
            ("adults_women", C::AdultsWomen, self.adults_women),
            ("youth_gents", C::YouthGents, self.youth_gents),
            ("youth_ladies", C::YouthLadies, self.youth_ladies),
            ("children_boys", C::ChildrenBoys, self.children_boys),
            ("children_girls", C::ChildrenGirls, self.children_girls),
            ("visitors_male", C::VisitorsMale, self.visitors_male),
            ("visitors_female", C::VisitorsFemale, self.visitors_female),
        ]
    }

    fn validate(&self) -> Result<(), String> {
        match self.fields().iter().find(|(_, _, n)| *n < 0) {
            Some((name, _, n)) => Err(format!("{name} cannot be negative (got {n})")),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AttendanceForm {
    pub service_type: String,
    #[serde(flatten)]
    pub counts: Counts,
}

/// Totals after a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceTotals {
    pub day: i64,
    pub month: i64,
}

pub async fn post_attendance(
    State(state): State<AppState>,
    Json(form): Json<AttendanceForm>,
) -> (StatusCode, Response) {
    let service = match utils::parse_service(&form.service_type) {
        Ok(s) => s,
        Err(resp) => return (StatusCode::BAD_REQUEST, resp),
    };
    if let Err(e) = form.counts.validate() {
        return (StatusCode::BAD_REQUEST, json_err!("{e}"));
    }

    let totals = match record(&state.db, utils::today(), service, &form.counts).await {
        Ok(totals) => totals,
        Err(e) => {
            log::error!("failed to record {service} attendance: {e:?}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                json_err!("failed to record attendance: {e}"),
            );
        }
    };

    let name = service.as_str();
    state
        .hub
        .publish(PushEvent::AttendanceUpdate(UpdateEvent::new(
            name,
            totals.day as f64,
        )))
        .await;
    state
        .hub
        .publish(PushEvent::MonthlyAttUpdate(UpdateEvent::new(
            name,
            totals.month as f64,
        )))
        .await;

    log::info!("{service} attendance saved, total {}", totals.day);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": format!("{service} attendance saved"),
            "service": name,
            "total": totals.day,
            "monthly_total": totals.month,
        }))
        .into_response(),
    )
}

/// Add `counts` to the day's row for `service`, creating it on first use.
/// Columns are 64-bit, so repeated large submissions cannot overflow them.
pub async fn record(
    db: &DatabaseConnection,
    date: NaiveDate,
    service: ServiceType,
    counts: &Counts,
) -> Result<AttendanceTotals> {
    let blank = attendance::ActiveModel {
        service_date: Set(date),
        service_type: Set(service.to_string()),
        adults_men: Set(0),
        adults_women: Set(0),
        youth_gents: Set(0),
        youth_ladies: Set(0),
        children_boys: Set(0),
        children_girls: Set(0),
        visitors_male: Set(0),
        visitors_female: Set(0),
        ..Default::default()
    };
    let txn = db.begin().await?;
    attendance::Entity::insert(blank)
        .on_conflict(
            OnConflict::columns([attendance::Column::ServiceDate, attendance::Column::ServiceType])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    // increment in place so concurrent submissions both count
    let mut update = attendance::Entity::update_many();
    for (_, col, n) in counts.fields() {
        update = update.col_expr(col, Expr::col(col).add(i64::from(n)));
    }
    update
        .filter(attendance::Column::ServiceDate.eq(date))
        .filter(attendance::Column::ServiceType.eq(service.as_str()))
        .exec(&txn)
        .await?;

    let day = day_total(&txn, date, service).await?;
    let month = month_total(&txn, date, service).await?;
    txn.commit().await?;
    Ok(AttendanceTotals { day, month })
}

pub async fn day_record<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
    service: ServiceType,
) -> Result<Option<attendance::Model>> {
    attendance::Entity::find()
        .filter(attendance::Column::ServiceDate.eq(date))
        .filter(attendance::Column::ServiceType.eq(service.as_str()))
        .one(db)
        .await
        .with_context(|| format!("failed to load {service} attendance for {date}"))
}

pub async fn day_total<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
    service: ServiceType,
) -> Result<i64> {
    Ok(day_record(db, date, service)
        .await?
        .map_or(0, |rec| rec.total()))
}

/// Attendance over the calendar month containing `date`.
pub async fn month_total<C: ConnectionTrait>(
    db: &C,
    date: NaiveDate,
    service: ServiceType,
) -> Result<i64> {
    let (first, next) = utils::month_range(date);
    let rows = attendance::Entity::find()
        .filter(attendance::Column::ServiceType.eq(service.as_str()))
        .filter(attendance::Column::ServiceDate.gte(first))
        .filter(attendance::Column::ServiceDate.lt(next))
        .all(db)
        .await?;
    Ok(rows.iter().map(attendance::Model::total).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_record_accumulates() {
        let db = db::memory().await;
        let day = date(2025, 11, 2);
        let counts = Counts {
            adults_men: 10,
            adults_women: 12,
            youth_gents: 3,
            youth_ladies: 4,
            children_boys: 5,
            children_girls: 6,
            visitors_male: 1,
            visitors_female: 2,
        };
        let totals = record(&db, day, ServiceType::Sunday, &counts).await.unwrap();
        assert_eq!(totals.day, 43);

        let more = Counts {
            visitors_female: 7,
            ..Default::default()
        };
        let totals = record(&db, day, ServiceType::Sunday, &more).await.unwrap();
        assert_eq!(totals, AttendanceTotals { day: 50, month: 50 });

        let row = day_record(&db, day, ServiceType::Sunday).await.unwrap().unwrap();
        assert_eq!(row.visitors_female, 9);
        assert_eq!(row.adults_men, 10);
    }

    #[tokio::test]
    async fn test_services_are_separate() {
        let db = db::memory().await;
        let day = date(2025, 11, 3);
        let counts = Counts {
            adults_men: 5,
            ..Default::default()
        };
        record(&db, day, ServiceType::Monday, &counts).await.unwrap();
        assert_eq!(day_total(&db, day, ServiceType::Monday).await.unwrap(), 5);
        assert_eq!(day_total(&db, day, ServiceType::Sunday).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_month_total_stays_in_month() {
        let db = db::memory().await;
        let counts = Counts {
            adults_women: 10,
            ..Default::default()
        };
        for day in [date(2025, 10, 31), date(2025, 11, 1), date(2025, 11, 30), date(2025, 12, 1)] {
            record(&db, day, ServiceType::Thursday, &counts).await.unwrap();
        }
        let total = month_total(&db, date(2025, 11, 15), ServiceType::Thursday)
            .await
            .unwrap();
        assert_eq!(total, 20);
    }

    #[tokio::test]
    async fn test_large_counts_keep_the_day_readable() {
        let db = db::memory().await;
        let day = date(2025, 11, 2);
        let huge = Counts {
            adults_men: i32::MAX,
            ..Default::default()
        };
        let one = Counts {
            adults_men: 1,
            ..Default::default()
        };
        record(&db, day, ServiceType::Sunday, &huge).await.unwrap();
        let totals = record(&db, day, ServiceType::Sunday, &one).await.unwrap();
        let expected = i64::from(i32::MAX) + 1;
        assert_eq!(totals, AttendanceTotals { day: expected, month: expected });

        let row = day_record(&db, day, ServiceType::Sunday).await.unwrap().unwrap();
        assert_eq!(row.adults_men, expected);
        assert_eq!(day_total(&db, day, ServiceType::Sunday).await.unwrap(), expected);
    }

    #[test]
    fn test_form_defaults_and_validation() {
        let form: AttendanceForm =
            serde_json::from_str(r#"{"service_type": "Sunday", "adults_men": 4}"#).unwrap();
        assert_eq!(form.counts.adults_men, 4);
        assert_eq!(form.counts.visitors_male, 0);
        assert!(form.counts.validate().is_ok());

        let negative = Counts {
            youth_gents: -1,
            ..Default::default()
        };
        assert!(negative.validate().unwrap_err().contains("youth_gents"));
    }
}
