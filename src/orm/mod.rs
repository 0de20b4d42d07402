//! SeaORM entities, one module per table.

pub mod admin;
pub mod adminlog;
pub mod authority;
pub mod collection;
pub mod comment;
pub mod movie;
pub mod operationlog;
pub mod preview;
pub mod role;
pub mod tag;
pub mod user;
pub mod userlog;

/// Value for `add_time` columns: local wall-clock time.
pub fn add_time_now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
