//! Push events shared between the server and the browser client.
//!
//! On the wire every event is a JSON object `{"event": <name>, "data": <payload>}`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::format;

/// A running total for one collection point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub service: String,
    pub total: f64,
}

impl UpdateEvent {
    pub fn new(service: impl Into<String>, total: f64) -> Self {
        Self {
            service: service.into(),
            total,
        }
    }
}

/// Events published by the server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    AttendanceUpdate(UpdateEvent),
    OfferingUpdate(UpdateEvent),
    MonthlyAttUpdate(UpdateEvent),
    MonthlyOffUpdate(UpdateEvent),
    FundUpdate { action: String, name: String },
    ContributionUpdate { fund: String, total: f64 },
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::AttendanceUpdate(_) => EventKind::Attendance.name(),
            PushEvent::OfferingUpdate(_) => EventKind::Offering.name(),
            PushEvent::MonthlyAttUpdate(_) => EventKind::MonthlyAttendance.name(),
            PushEvent::MonthlyOffUpdate(_) => EventKind::MonthlyOffering.name(),
            PushEvent::FundUpdate { .. } => "fund_update",
            PushEvent::ContributionUpdate { .. } => "contribution_update",
        }
    }

    /// The counter this event drives on the dashboard, if any.
    pub fn counter(&self) -> Option<(EventKind, &UpdateEvent)> {
        match self {
            PushEvent::AttendanceUpdate(u) => Some((EventKind::Attendance, u)),
            PushEvent::OfferingUpdate(u) => Some((EventKind::Offering, u)),
            PushEvent::MonthlyAttUpdate(u) => Some((EventKind::MonthlyAttendance, u)),
            PushEvent::MonthlyOffUpdate(u) => Some((EventKind::MonthlyOffering, u)),
            PushEvent::FundUpdate { .. } | PushEvent::ContributionUpdate { .. } => None,
        }
    }
}

/// The four counter event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Attendance,
    Offering,
    MonthlyAttendance,
    MonthlyOffering,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Attendance,
        EventKind::Offering,
        EventKind::MonthlyAttendance,
        EventKind::MonthlyOffering,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Attendance => "attendance_update",
            EventKind::Offering => "offering_update",
            EventKind::MonthlyAttendance => "monthly_att_update",
            EventKind::MonthlyOffering => "monthly_off_update",
        }
    }

    /// Prefix of the DOM id holding this counter
    pub fn prefix(self) -> &'static str {
        match self {
            EventKind::Attendance => "att-",
            EventKind::Offering => "off-",
            EventKind::MonthlyAttendance => "monthly-att-",
            EventKind::MonthlyOffering => "monthly-off-",
        }
    }

    pub fn target_id(self, service: &str) -> String {
        format!("{}{}", self.prefix(), service)
    }

    pub fn format(self, total: f64) -> String {
        match self {
            EventKind::Attendance | EventKind::MonthlyAttendance => format::count(total),
            EventKind::Offering | EventKind::MonthlyOffering => format::currency(total),
        }
    }
}

/// Response of a long-poll request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PollBatch {
    /// Sequence number of the newest event the server has published
    pub cursor: u64,
    pub events: Vec<PushEvent>,
}

/// Services the church holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceType {
    Sunday,
    Monday,
    Thursday,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [ServiceType::Sunday, ServiceType::Monday, ServiceType::Thursday];

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Sunday => "Sunday",
            ServiceType::Monday => "Monday",
            ServiceType::Thursday => "Thursday",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown service type `{s}`"))
    }
}
