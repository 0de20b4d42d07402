//! SeaORM Entity for admin table

use sea_orm::entity::prelude::*;

/// `is_super` value marking a super administrator.
pub const SUPER_ADMIN: i16 = 0;
/// `is_super` value for ordinary administrators.
pub const REGULAR_ADMIN: i16 = 1;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "admin")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(Some(100))")]
    pub name: String,
    /// Argon2 PHC string.
    pub password: String,
    pub is_super: i16,
    pub role_id: Option<i32>,
    pub add_time: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Role,
    #[sea_orm(has_many = "super::adminlog::Entity")]
    Adminlog,
    #[sea_orm(has_many = "super::operationlog::Entity")]
    Operationlog,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::adminlog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Adminlog.def()
    }
}

impl Related<super::operationlog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operationlog.def()
    }
}

impl Model {
    pub fn is_super_admin(&self) -> bool {
        self.is_super == SUPER_ADMIN
    }
}

impl ActiveModelBehavior for ActiveModel {}
