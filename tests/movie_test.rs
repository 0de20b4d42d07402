//! Movie management tests

mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use common::database::setup_test_database;
use common::fixtures::{create_test_admin, create_test_movie, create_test_tag};
use common::http::{
    csrf_token_from, location, multipart_body, multipart_content_type, session_cookie,
    session_middleware,
};
use moviesite::orm::{movie, operationlog};
use moviesite::storage::LocalStorage;
use moviesite::web::admin::movie::{delete_movie, update_movie, MovieForm};
use moviesite::web::admin::SaveResult;
use sea_orm::{entity::*, query::*, PaginatorTrait};

fn form_for(title: &str, tag_id: i32) -> MovieForm {
    MovieForm {
        title: title.to_owned(),
        info: "Two hours of rain.".to_owned(),
        area: "Japan".to_owned(),
        length: "2h".to_owned(),
        release_time: "1985-12-24".to_owned(),
        rating: "5".to_owned(),
        tag_id: tag_id.to_string(),
    }
}

#[actix_rt::test]
async fn test_update_without_files_keeps_paths() {
    let db = setup_test_database().await.unwrap();
    let tag = create_test_tag(&db, "Noir").await.unwrap();
    let original = create_test_movie(&db, "Rain", Some(tag.id)).await.unwrap();

    let input = form_for("Heavy Rain", tag.id).check().unwrap();
    let updated = match update_movie(&db, original.clone(), input, None, None)
        .await
        .unwrap()
    {
        SaveResult::Saved(m) => m,
        SaveResult::Duplicate => panic!("title is free"),
    };

    assert_eq!(updated.title, "Heavy Rain");
    assert_eq!(updated.rating, 5);
    assert_eq!(updated.url, original.url);
    assert_eq!(updated.cover, original.cover);

    let input = form_for("Heavy Rain", tag.id).check().unwrap();
    let replaced = match update_movie(&db, updated, input, None, Some("new.jpg".to_owned()))
        .await
        .unwrap()
    {
        SaveResult::Saved(m) => m,
        SaveResult::Duplicate => panic!("keeping its own title is allowed"),
    };
    assert_eq!(replaced.url, original.url);
    assert_eq!(replaced.cover, "new.jpg");
}

#[actix_rt::test]
async fn test_update_refuses_other_movies_title() {
    let db = setup_test_database().await.unwrap();
    let tag = create_test_tag(&db, "Noir").await.unwrap();
    create_test_movie(&db, "Chinatown", Some(tag.id)).await.unwrap();
    let other = create_test_movie(&db, "Vertigo", Some(tag.id)).await.unwrap();

    let input = form_for("Chinatown", tag.id).check().unwrap();
    let result = update_movie(&db, other.clone(), input, None, None)
        .await
        .unwrap();
    assert!(result.is_duplicate());

    let unchanged = movie::Entity::find_by_id(other.id).one(&db).await.unwrap().unwrap();
    assert_eq!(unchanged.title, "Vertigo");
}

#[actix_rt::test]
async fn test_delete_movie_leaves_other_rows() {
    let db = setup_test_database().await.unwrap();
    let a = create_test_movie(&db, "Alpha", None).await.unwrap();
    create_test_movie(&db, "Beta", None).await.unwrap();

    let deleted = delete_movie(&db, a.id).await.unwrap().unwrap();
    assert_eq!(deleted.title, "Alpha");
    assert!(delete_movie(&db, a.id).await.unwrap().is_none());
    assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_movie_upload_flow() {
    let db = setup_test_database().await.unwrap();
    let uploads = tempfile::tempdir().unwrap();
    create_test_admin(&db, "root", "hunter22").await.unwrap();
    let tag = create_test_tag(&db, "Sci-Fi").await.unwrap();
    let tag_id = tag.id.to_string();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(LocalStorage::new(uploads.path())))
            .wrap(session_middleware())
            .configure(moviesite::web::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form(&[("account", "root"), ("password", "hunter22")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let mut cookie = session_cookie(&resp).unwrap();

    let req = test::TestRequest::get()
        .uri("/admin/movie/add")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Sci-Fi"));
    let token = csrf_token_from(&body).unwrap();

    // Nothing but the token: every field complains, nothing is stored
    let req = test::TestRequest::post()
        .uri("/admin/movie/add")
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(&[("csrf_token", token.as_str())], &[]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Please enter a title."));
    assert!(body.contains("Please upload the movie file."));
    assert!(body.contains("Please upload a cover image."));
    assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 0);

    let texts = [
        ("csrf_token", token.as_str()),
        ("title", "Solaris"),
        ("info", "A planet that thinks."),
        ("area", "USSR"),
        ("length", "2h47m"),
        ("release_time", "1972-03-20"),
        ("rating", "5"),
        ("tag_id", tag_id.as_str()),
    ];
    let files: [(&str, &str, &[u8]); 2] = [
        ("url", "solaris.MP4", b"not really a video"),
        ("cover", "poster.jpg", b"not really a jpeg"),
    ];
    let req = test::TestRequest::post()
        .uri("/admin/movie/add")
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(&texts, &files))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin/movie/add");
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }

    let stored = movie::Entity::find()
        .filter(movie::Column::Title.eq("Solaris"))
        .one(&db)
        .await
        .unwrap()
        .expect("movie was inserted");
    assert_eq!(stored.views, 0);
    assert_eq!(stored.review_num, 0);
    assert_eq!(stored.tag_id, Some(tag.id));
    assert!(stored.url.ends_with(".MP4"));
    assert!(stored.cover.ends_with(".jpg"));
    assert_ne!(stored.url, "solaris.MP4");
    assert_eq!(
        std::fs::read(uploads.path().join(&stored.url)).unwrap(),
        b"not really a video"
    );

    // Same title again is refused with a flash
    let req = test::TestRequest::post()
        .uri("/admin/movie/add")
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(&texts, &files))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(operationlog::Entity::find().count(&db).await.unwrap(), 1);

    // The list shows the tag name
    let req = test::TestRequest::get()
        .uri("/admin/movie/list/1")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Solaris"));
    assert!(body.contains("Sci-Fi"));
    assert!(body.contains("Movie &quot;Solaris&quot; already exists!"));
}

#[actix_rt::test]
async fn test_movie_add_rejects_unknown_tag() {
    let db = setup_test_database().await.unwrap();
    let uploads = tempfile::tempdir().unwrap();
    create_test_admin(&db, "root", "hunter22").await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(LocalStorage::new(uploads.path())))
            .wrap(session_middleware())
            .configure(moviesite::web::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form(&[("account", "root"), ("password", "hunter22")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let mut cookie = session_cookie(&resp).unwrap();

    let req = test::TestRequest::get()
        .uri("/admin/movie/add")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = csrf_token_from(&body).unwrap();

    let texts = [
        ("csrf_token", token.as_str()),
        ("title", "Stalker"),
        ("info", "The Zone."),
        ("area", "USSR"),
        ("length", "2h42m"),
        ("release_time", "1979-05-25"),
        ("rating", "5"),
        ("tag_id", "999"),
    ];
    let files: [(&str, &str, &[u8]); 2] = [
        ("url", "stalker.mkv", b"video"),
        ("cover", "stalker.png", b"image"),
    ];
    let req = test::TestRequest::post()
        .uri("/admin/movie/add")
        .cookie(cookie)
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(&texts, &files))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Please choose an existing tag."));

    assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
}

#[actix_rt::test]
async fn test_movie_update_and_delete_over_http() {
    let db = setup_test_database().await.unwrap();
    let uploads = tempfile::tempdir().unwrap();
    create_test_admin(&db, "root", "hunter22").await.unwrap();
    let tag = create_test_tag(&db, "Western").await.unwrap();
    let original = create_test_movie(&db, "Shane", Some(tag.id)).await.unwrap();
    let tag_id = tag.id.to_string();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(LocalStorage::new(uploads.path())))
            .wrap(session_middleware())
            .configure(moviesite::web::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form(&[("account", "root"), ("password", "hunter22")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let mut cookie = session_cookie(&resp).unwrap();

    let update_uri = format!("/admin/movie/update/{}", original.id);
    let req = test::TestRequest::get()
        .uri(&update_uri)
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("value=\"Shane\""));
    let token = csrf_token_from(&body).unwrap();

    // File inputs left empty arrive as parts with no filename and no bytes
    let texts = [
        ("csrf_token", token.as_str()),
        ("title", "Shane (restored)"),
        ("info", "A gunfighter rides in."),
        ("area", "USA"),
        ("length", "1h58m"),
        ("release_time", "1953-04-23"),
        ("rating", "4"),
        ("tag_id", tag_id.as_str()),
    ];
    let files: [(&str, &str, &[u8]); 2] = [("url", "", b""), ("cover", "", b"")];
    let req = test::TestRequest::post()
        .uri(&update_uri)
        .cookie(cookie.clone())
        .insert_header((header::CONTENT_TYPE, multipart_content_type()))
        .set_payload(multipart_body(&texts, &files))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), update_uri);
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }

    let updated = movie::Entity::find_by_id(original.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Shane (restored)");
    assert_eq!(updated.rating, 4);
    assert_eq!(updated.url, original.url);
    assert_eq!(updated.cover, original.cover);
    assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    assert_eq!(operationlog::Entity::find().count(&db).await.unwrap(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/admin/movie/delete/{}", original.id))
        .cookie(cookie)
        .set_form(&[("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin/movie/list/1");

    assert!(movie::Entity::find_by_id(original.id)
        .one(&db)
        .await
        .unwrap()
        .is_none());
    let reasons: Vec<String> = operationlog::Entity::find()
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.reason)
        .collect();
    assert_eq!(
        reasons,
        vec![
            "Edited movie \"Shane (restored)\"".to_owned(),
            "Deleted movie \"Shane (restored)\"".to_owned(),
        ]
    );
}
