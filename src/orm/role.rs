//! SeaORM Entity for role table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "role")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(Some(100))")]
    pub name: String,
    /// Comma separated authority ids.
    #[sea_orm(column_type = "String(Some(600))")]
    pub authorities: String,
    pub add_time: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::admin::Entity")]
    Admin,
}

impl Related<super::admin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Admin.def()
    }
}

impl Model {
    /// Parses the stored authority list, skipping anything that is not an id.
    pub fn authority_ids(&self) -> Vec<i32> {
        parse_authority_ids(&self.authorities)
    }
}

pub fn parse_authority_ids(raw: &str) -> Vec<i32> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<i32>().ok())
        .collect()
}

pub fn join_authority_ids(ids: &[i32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl ActiveModelBehavior for ActiveModel {}
