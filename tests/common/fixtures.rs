//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::NaiveDate;
use moviesite::orm::{add_time_now, admin, collection, comment, movie, preview, tag, user, userlog};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Create an administrator with known credentials
pub async fn create_test_admin(
    db: &DatabaseConnection,
    name: &str,
    password: &str,
) -> Result<admin::Model, DbErr> {
    let password_hash = moviesite::session::hash_password(password)
        .map_err(|e| DbErr::Custom(format!("Password hashing failed: {}", e)))?;

    admin::ActiveModel {
        name: Set(name.to_owned()),
        password: Set(password_hash),
        is_super: Set(admin::SUPER_ADMIN),
        role_id: Set(None),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_tag(db: &DatabaseConnection, name: &str) -> Result<tag::Model, DbErr> {
    tag::ActiveModel {
        name: Set(name.to_owned()),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a movie whose files are named after its title
pub async fn create_test_movie(
    db: &DatabaseConnection,
    title: &str,
    tag_id: Option<i32>,
) -> Result<movie::Model, DbErr> {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    movie::ActiveModel {
        title: Set(title.to_owned()),
        url: Set(format!("{}.mp4", stem)),
        info: Set(format!("About {}", title)),
        cover: Set(format!("{}.jpg", stem)),
        rating: Set(3),
        views: Set(0),
        review_num: Set(0),
        tag_id: Set(tag_id),
        area: Set("Nowhere".to_owned()),
        release_time: Set(NaiveDate::from_ymd_opt(2001, 9, 9).unwrap()),
        length: Set("90 min".to_owned()),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_preview(
    db: &DatabaseConnection,
    title: &str,
) -> Result<preview::Model, DbErr> {
    preview::ActiveModel {
        title: Set(title.to_owned()),
        cover: Set(format!("{}.png", title.replace(' ', "_"))),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<user::Model, DbErr> {
    user::ActiveModel {
        name: Set(name.to_owned()),
        password: Set("not-a-phc-string".to_owned()),
        email: Set(Some(format!("{}@test.com", name))),
        phone: Set(None),
        info: Set(None),
        avatar: Set(None),
        add_time: Set(add_time_now()),
        uuid: Set(uuid::Uuid::new_v4().simple().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_comment(
    db: &DatabaseConnection,
    content: &str,
    movie_id: i32,
    user_id: i32,
) -> Result<comment::Model, DbErr> {
    comment::ActiveModel {
        content: Set(content.to_owned()),
        movie_id: Set(Some(movie_id)),
        user_id: Set(Some(user_id)),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_collection(
    db: &DatabaseConnection,
    movie_id: i32,
    user_id: i32,
) -> Result<collection::Model, DbErr> {
    collection::ActiveModel {
        movie_id: Set(Some(movie_id)),
        user_id: Set(Some(user_id)),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn create_test_userlog(
    db: &DatabaseConnection,
    user_id: i32,
    ip: &str,
) -> Result<userlog::Model, DbErr> {
    userlog::ActiveModel {
        user_id: Set(Some(user_id)),
        ip: Set(ip.to_owned()),
        add_time: Set(add_time_now()),
        ..Default::default()
    }
    .insert(db)
    .await
}
