mod common;

use axum::http::StatusCode;
use common::*;
use groupshare::entities::{prelude::*, sessions, users};
use sea_orm::{ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter};

fn registration(username: &str, password: &str, confirmation: &str) -> String {
    format!(
        "actual_name=Ada+Lovelace&username={}&password={}&conf_password={}",
        username, password, confirmation
    )
}

async fn find_user(app: &TestApp, username: &str) -> Option<users::Model> {
    Users::find()
        .filter(users::Column::Username.eq(username))
        .one(&app.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_creates_pending_account() {
    let app = setup().await;

    let response = app
        .send(form_request(
            "POST",
            "/register",
            None,
            &registration("adalovelace", "engine1843", "engine1843"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/home");
    assert_eq!(flash(&response), "success:Welcome to GroupShare, Ada Lovelace!");
    let cookie = session_cookie(&response).expect("session cookie");

    let user = find_user(&app, "adalovelace").await.unwrap();
    assert!(!user.is_active);
    assert!(!user.is_admin);
    assert_eq!(user.user_limit, 10);
    assert_eq!(user.current_usage, 0);
    assert_ne!(user.password_hash, "engine1843");

    // Pending accounts are logged in but cannot reach the items
    let response = app.send(get("/home", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["view"], "auth/wait");

    let response = app.send(get(&format!("/user/{}", user.id), Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["remaining_mb"], 10);
    assert_eq!(body["data"]["groups"][0]["group_name"], "default");
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let app = setup().await;

    let response = app
        .send(form_request(
            "POST",
            "/register",
            None,
            &registration("mismatch", "engine1843", "engine1844"),
        ))
        .await;

    assert_eq!(location(&response), "/register");
    assert_eq!(flash(&response), "error:Passwords do not match.");
    assert!(session_cookie(&response).is_none());
    assert!(find_user(&app, "mismatch").await.is_none());
}

#[tokio::test]
async fn test_register_rejects_weak_passwords() {
    let app = setup().await;

    let response = app
        .send(form_request(
            "POST",
            "/register",
            None,
            &registration("weakling", "password1", "password1"),
        ))
        .await;
    assert_eq!(
        flash(&response),
        "error:Common words are not accepted as a password."
    );

    let response = app
        .send(form_request(
            "POST",
            "/register",
            None,
            &registration("weakling", "nodigitshere", "nodigitshere"),
        ))
        .await;
    assert_eq!(
        flash(&response),
        "error:The password must be at least 8 characters long and contain a number."
    );

    assert!(find_user(&app, "weakling").await.is_none());
}

#[tokio::test]
async fn test_register_rejects_bad_username() {
    let app = setup().await;

    let response = app
        .send(form_request(
            "POST",
            "/register",
            None,
            &registration("ada", "engine1843", "engine1843"),
        ))
        .await;
    assert_eq!(
        flash(&response),
        "error:Username must be 6-16 characters long."
    );

    let response = app
        .send(form_request(
            "POST",
            "/register",
            None,
            &registration("ada+lovelace", "engine1843", "engine1843"),
        ))
        .await;
    assert_eq!(
        flash(&response),
        "error:No spaces are allowed in the username."
    );
}

#[tokio::test]
async fn test_register_rejects_taken_username() {
    let app = setup().await;
    create_user(&app.db, "takenname", true, false, 10, 0).await;

    let response = app
        .send(form_request(
            "POST",
            "/register",
            None,
            &registration("takenname", "engine1843", "engine1843"),
        ))
        .await;

    assert_eq!(location(&response), "/register");
    assert_eq!(
        flash(&response),
        "error:A user with the given username is already registered"
    );
    assert_eq!(
        Users::find()
            .filter(users::Column::Username.eq("takenname"))
            .count(&app.db)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_register_with_selected_group() {
    let app = setup().await;
    let climbers = create_group(&app.db, "climbers", 0, 25).await;

    let body = format!(
        "{}&groups={}",
        registration("newclimber", "engine1843", "engine1843"),
        climbers.id
    );
    app.send(form_request("POST", "/register", None, &body)).await;

    let user = find_user(&app, "newclimber").await.unwrap();
    let mut joined: Vec<String> = user
        .find_related(Groups)
        .all(&app.db)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.group_name)
        .collect();
    joined.sort();
    assert_eq!(joined, vec!["climbers".to_string(), "default".to_string()]);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = setup().await;
    create_user(&app.db, "forgetful", true, false, 10, 0).await;

    let response = app
        .send(form_request(
            "POST",
            "/login",
            None,
            "username=forgetful&password=not-it-42",
        ))
        .await;

    assert_eq!(location(&response), "/login");
    assert_eq!(flash(&response), "error:Password or username is incorrect");
    assert!(session_cookie(&response).is_none());
    assert_eq!(Sessions::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = setup().await;
    let user = create_user(&app.db, "roundtrip", true, false, 10, 0).await;

    let response = app
        .send(form_request(
            "POST",
            "/login",
            None,
            &format!("username=roundtrip&password={}", PASSWORD),
        ))
        .await;
    assert_eq!(flash(&response), "success:Welcome to GroupShare!");
    let cookie = session_cookie(&response).unwrap();

    let session = Sessions::find()
        .filter(sessions::Column::UserId.eq(&user.id))
        .one(&app.db)
        .await
        .unwrap();
    assert!(session.is_some());

    let response = app.send(get("/home", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get("/logout", Some(&cookie))).await;
    assert_eq!(location(&response), "/");
    assert_eq!(flash(&response), "success:Logged Out!");
    assert_eq!(Sessions::find().count(&app.db).await.unwrap(), 0);

    // The old token no longer resolves to a session
    let response = app.send(get("/home", Some(&cookie))).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_login_form_requires_logged_out() {
    let app = setup().await;
    create_user(&app.db, "alreadyin", true, false, 10, 0).await;
    let cookie = app.login("alreadyin").await;

    let response = app.send(get("/login", Some(&cookie))).await;
    assert_eq!(location(&response), "/home");
    assert_eq!(flash(&response), "error:Already logged in.");

    let response = app.send(get("/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["view"], "auth/login");
}

#[tokio::test]
async fn test_anonymous_requests_go_to_login() {
    let app = setup().await;

    for uri in ["/home", "/groups", "/admin", "/home/new"] {
        let response = app.send(get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/login", "{}", uri);
        assert_eq!(
            flash(&response),
            "error:You need to be logged in to do that!"
        );
    }

    let response = app.send(get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tampered_session_cookie_is_anonymous() {
    let app = setup().await;

    let response = app
        .send(get("/home", Some("session=not.a.token")))
        .await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_profile_of_another_user_is_forbidden() {
    let app = setup().await;
    create_user(&app.db, "curious1", true, false, 10, 0).await;
    let other = create_user(&app.db, "private1", true, false, 10, 4).await;
    let cookie = app.login("curious1").await;

    let response = app.send(get(&format!("/user/{}", other.id), Some(&cookie))).await;
    assert_eq!(location(&response), "/home");
    assert_eq!(flash(&response), "error:You don't have permission to do that");
}
