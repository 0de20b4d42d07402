//! Append-only audit rows for administrator logins and operations.

use crate::orm::{add_time_now, adminlog, operationlog};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Longest reason the operationlog column holds.
pub const MAX_REASON_LEN: usize = 100;

pub async fn record_admin_login(
    db: &DatabaseConnection,
    admin_id: i32,
    ip: &str,
) -> Result<adminlog::Model, DbErr> {
    adminlog::ActiveModel {
        admin_id: Set(Some(admin_id)),
        ip: Set(ip.to_owned()),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn record_operation(
    db: &DatabaseConnection,
    admin_id: i32,
    ip: &str,
    reason: &str,
) -> Result<operationlog::Model, DbErr> {
    operationlog::ActiveModel {
        admin_id: Set(Some(admin_id)),
        ip: Set(ip.to_owned()),
        reason: Set(truncate_reason(reason)),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Cuts `reason` to at most [`MAX_REASON_LEN`] characters.
pub fn truncate_reason(reason: &str) -> String {
    reason.chars().take(MAX_REASON_LEN).collect()
}
