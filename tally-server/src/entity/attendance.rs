use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service_date: Date,
    pub service_type: String,

    pub adults_men: i64,
    pub adults_women: i64,
    pub youth_gents: i64,
    pub youth_ladies: i64,
    pub children_boys: i64,
    pub children_girls: i64,
    pub visitors_male: i64,
    pub visitors_female: i64,
}

impl Model {
    pub fn total(&self) -> i64 {
        [
            self.adults_men,
            self.adults_women,
            self.youth_gents,
            self.youth_ladies,
            self.children_boys,
            self.children_girls,
            self.visitors_male,
            self.visitors_female,
        ]
        .iter()
        .sum()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
