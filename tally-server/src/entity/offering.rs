use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "offering")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service_date: Date,
    pub service_type: String,
    pub first_offering: f64,
    pub second_offering: f64,
}

impl Model {
    pub fn total(&self) -> f64 {
        self.first_offering + self.second_offering
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
