//! SeaORM Entity for user table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(Some(100))")]
    pub name: String,
    #[sea_orm(column_type = "String(Some(100))")]
    pub password: String,
    #[sea_orm(unique, column_type = "String(Some(100))", nullable)]
    pub email: Option<String>,
    #[sea_orm(unique, column_type = "String(Some(11))", nullable)]
    pub phone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub info: Option<String>,
    #[sea_orm(unique)]
    pub avatar: Option<String>,
    pub add_time: DateTime,
    #[sea_orm(unique)]
    pub uuid: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::userlog::Entity")]
    Userlog,
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    #[sea_orm(has_many = "super::collection::Entity")]
    Collection,
}

impl Related<super::userlog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Userlog.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::collection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Collection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
