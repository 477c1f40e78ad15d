//! sea-orm entities, one per table created by the migration crate.

pub mod attendance;
pub mod contribution;
pub mod fund;
pub mod member;
pub mod monthly_budget;
pub mod offering;
pub mod user;
