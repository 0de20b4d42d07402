//! Tag management tests

mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use common::database::setup_test_database;
use common::fixtures::{create_test_admin, create_test_movie, create_test_tag};
use common::http::{csrf_token_from, location, session_cookie, session_middleware};
use moviesite::orm::{movie, operationlog, tag};
use moviesite::web::admin::tag::{delete_tag, insert_tag, rename_tag};
use moviesite::web::admin::SaveResult;
use sea_orm::{entity::*, query::*, PaginatorTrait};

#[actix_rt::test]
async fn test_insert_tag_rejects_duplicate_name() {
    let db = setup_test_database().await.unwrap();

    let first = insert_tag(&db, "Drama").await.unwrap();
    assert!(matches!(first, SaveResult::Saved(ref t) if t.name == "Drama"));

    let second = insert_tag(&db, "Drama").await.unwrap();
    assert!(second.is_duplicate());

    assert_eq!(tag::Entity::find().count(&db).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_rename_tag_keeps_own_name_but_not_others() {
    let db = setup_test_database().await.unwrap();
    let drama = create_test_tag(&db, "Drama").await.unwrap();
    create_test_tag(&db, "Comedy").await.unwrap();

    // Saving without changing the name is fine
    let same = rename_tag(&db, drama.clone(), "Drama").await.unwrap();
    assert!(!same.is_duplicate());

    // Taking another tag's name is not
    let taken = rename_tag(&db, drama.clone(), "Comedy").await.unwrap();
    assert!(taken.is_duplicate());

    match rename_tag(&db, drama, "Tragedy").await.unwrap() {
        SaveResult::Saved(renamed) => assert_eq!(renamed.name, "Tragedy"),
        SaveResult::Duplicate => panic!("rename to a free name was refused"),
    }
}

#[actix_rt::test]
async fn test_delete_tag_orphans_movies() {
    let db = setup_test_database().await.unwrap();
    let horror = create_test_tag(&db, "Horror").await.unwrap();
    let other = create_test_tag(&db, "Other").await.unwrap();
    let a = create_test_movie(&db, "The Fog", Some(horror.id)).await.unwrap();
    let b = create_test_movie(&db, "The Thing", Some(horror.id)).await.unwrap();
    let c = create_test_movie(&db, "Heat", Some(other.id)).await.unwrap();

    let (deleted, orphaned) = delete_tag(&db, horror.id).await.unwrap().unwrap();
    assert_eq!(deleted.name, "Horror");
    assert_eq!(orphaned, 2);

    for id in [a.id, b.id] {
        let m = movie::Entity::find_by_id(id).one(&db).await.unwrap().unwrap();
        assert_eq!(m.tag_id, None);
    }
    let untouched = movie::Entity::find_by_id(c.id).one(&db).await.unwrap().unwrap();
    assert_eq!(untouched.tag_id, Some(other.id));

    assert!(delete_tag(&db, horror.id).await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_tag_add_flow_over_http() {
    let db = setup_test_database().await.unwrap();
    create_test_admin(&db, "root", "hunter22").await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.clone()))
            .wrap(session_middleware())
            .configure(moviesite::web::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form(&[("account", "root"), ("password", "hunter22")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let mut cookie = session_cookie(&resp).expect("login sets a session cookie");

    let req = test::TestRequest::get()
        .uri("/admin/tag/add")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = csrf_token_from(&body).expect("form carries a CSRF token");

    // Missing token is refused before anything is written
    let req = test::TestRequest::post()
        .uri("/admin/tag/add")
        .cookie(cookie.clone())
        .set_form(&[("name", "Western")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Empty name re-renders with the field error
    let req = test::TestRequest::post()
        .uri("/admin/tag/add")
        .cookie(cookie.clone())
        .set_form(&[("csrf_token", token.as_str()), ("name", "  ")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Please enter a tag name."));

    let req = test::TestRequest::post()
        .uri("/admin/tag/add")
        .cookie(cookie.clone())
        .set_form(&[("csrf_token", token.as_str()), ("name", "Western")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin/tag/add");
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }

    // The flash shows up on the next page
    let req = test::TestRequest::get()
        .uri("/admin/tag/add")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Added tag &quot;Western&quot;."));

    // A second add with the same name inserts nothing
    let req = test::TestRequest::post()
        .uri("/admin/tag/add")
        .cookie(cookie.clone())
        .set_form(&[("csrf_token", token.as_str()), ("name", "Western")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    let req = test::TestRequest::get()
        .uri("/admin/tag/add")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Tag &quot;Western&quot; already exists!"));

    let tags = tag::Entity::find()
        .filter(tag::Column::Name.eq("Western"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(tags, 1);

    let logged = operationlog::Entity::find().all(&db).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].reason, "Added tag \"Western\"");
}

#[actix_rt::test]
async fn test_tag_list_pages() {
    let db = setup_test_database().await.unwrap();
    create_test_admin(&db, "root", "hunter22").await.unwrap();
    for i in 0..12 {
        create_test_tag(&db, &format!("tag-{:02}", i)).await.unwrap();
    }

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.clone()))
            .wrap(session_middleware())
            .configure(moviesite::web::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/admin/login")
        .set_form(&[("account", "root"), ("password", "hunter22")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = session_cookie(&resp).unwrap();

    for (uri, status) in [
        ("/admin/tag/list", StatusCode::OK),
        ("/admin/tag/list/1", StatusCode::OK),
        ("/admin/tag/list/2", StatusCode::OK),
        ("/admin/tag/list/3", StatusCode::NOT_FOUND),
        ("/admin/tag/list/0", StatusCode::NOT_FOUND),
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), status, "{}", uri);
    }
}

#[actix_rt::test]
async fn test_tag_pages_require_login() {
    let db = setup_test_database().await.unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db))
            .wrap(session_middleware())
            .configure(moviesite::web::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/admin/tag/list/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin/login?next=%2Fadmin%2Ftag%2Flist%2F1");
}

#[actix_rt::test]
async fn test_tag_update_and_delete_over_http() {
    let db = setup_test_database().await.unwrap();
    create_test_admin(&db, "root", "hunter22").await.unwrap();
    let noir = create_test_tag(&db, "Noir").await.unwrap();
    create_test_tag(&db, "Drama").await.unwrap();
    let film = create_test_movie(&db, "The Third Man", Some(noir.id))
        .await
        .unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(db.clone()))
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

    let update_uri = format!("/admin/tag/update/{}", noir.id);
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
    let token = csrf_token_from(&body).unwrap();

    // Taking another tag's name changes nothing and logs nothing
    let req = test::TestRequest::post()
        .uri(&update_uri)
        .cookie(cookie.clone())
        .set_form(&[("csrf_token", token.as_str()), ("name", "Drama")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    assert_eq!(operationlog::Entity::find().count(&db).await.unwrap(), 0);

    let req = test::TestRequest::post()
        .uri(&update_uri)
        .cookie(cookie.clone())
        .set_form(&[("csrf_token", token.as_str()), ("name", "Film noir")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), update_uri);
    if let Some(c) = session_cookie(&resp) {
        cookie = c;
    }
    let renamed = tag::Entity::find_by_id(noir.id).one(&db).await.unwrap().unwrap();
    assert_eq!(renamed.name, "Film noir");
    assert_eq!(operationlog::Entity::find().count(&db).await.unwrap(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/admin/tag/delete/{}", noir.id))
        .cookie(cookie.clone())
        .set_form(&[("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/admin/tag/list/1");

    assert!(tag::Entity::find_by_id(noir.id).one(&db).await.unwrap().is_none());
    let survivor = movie::Entity::find_by_id(film.id)
        .one(&db)
        .await
        .unwrap()
        .expect("movie outlives its tag");
    assert_eq!(survivor.tag_id, None);
    assert_eq!(operationlog::Entity::find().count(&db).await.unwrap(), 2);

    // A second delete of the same tag is a 404 and logs nothing
    let req = test::TestRequest::post()
        .uri(&format!("/admin/tag/delete/{}", noir.id))
        .cookie(cookie)
        .set_form(&[("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(operationlog::Entity::find().count(&db).await.unwrap(), 2);
}
