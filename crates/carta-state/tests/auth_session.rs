use carta_api::{StorefrontApi, UserData};
use carta_core::ErrorKind;
use carta_fs::init_workspace;
use carta_state::AuthManager;
use carta_store::{KvStore, Session, SessionStore};
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

fn session_store() -> (tempfile::TempDir, SessionStore) {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("workspace");
    let init =
        init_workspace(Some(&root), Some("https://api.example.com")).expect("init workspace");
    let kv = KvStore::open(&init.paths).expect("kv store");
    (temp, SessionStore::new(kv))
}

fn manager(server: &MockServer, store: &SessionStore) -> AuthManager {
    let api = StorefrontApi::new(&server.base_url()).expect("api client");
    AuthManager::new(api, store.clone()).expect("auth manager")
}

#[test]
fn login_success_replaces_and_persists_the_session() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    let login = server.mock(|when, then| {
        when.method(POST).path("/login").json_body(json!({
            "email": "user@example.com",
            "password": "secret-1",
        }));
        then.status(200).json_body(json!({
            "ok": true,
            "user": { "id": 7, "email": "user@example.com" },
            "accessToken": "token-abc",
        }));
    });

    let mut auth = manager(&server, &store);
    assert!(!auth.is_authenticated());

    auth.login("user@example.com", "secret-1").expect("login");

    login.assert_hits(1);
    assert!(auth.is_authenticated());
    assert_eq!(auth.session().token(), Some("token-abc"));
    assert!(auth.error().is_none());
    assert!(!auth.is_loading());

    let persisted = store.load().expect("load").expect("persisted session");
    assert_eq!(persisted.token(), Some("token-abc"));
    assert!(persisted.is_authenticated());
}

#[test]
fn is_authenticated_always_tracks_user_presence() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).json_body(json!({
            "ok": true,
            "user": { "id": 1 },
            "accessToken": "token-abc",
        }));
    });

    let mut auth = manager(&server, &store);
    assert_eq!(auth.is_authenticated(), auth.session().user.is_some());

    auth.login("user@example.com", "secret-1").expect("login");
    assert_eq!(auth.is_authenticated(), auth.session().user.is_some());
    assert!(auth.is_authenticated());

    auth.logout().expect("logout");
    assert_eq!(auth.is_authenticated(), auth.session().user.is_some());
    assert!(!auth.is_authenticated());
}

#[test]
fn rejected_login_records_the_server_message() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).json_body(json!({
            "ok": false,
            "error": "wrong email or password",
        }));
    });

    let mut auth = manager(&server, &store);
    let error = auth
        .login("user@example.com", "bad")
        .expect_err("login should fail");

    assert_eq!(error.kind, ErrorKind::Auth);
    assert_eq!(error.message, "wrong email or password");
    assert_eq!(auth.error(), Some("wrong email or password"));
    assert!(!auth.is_authenticated());
    assert!(store.load().expect("load").is_none(), "nothing persisted");

    auth.clear_error();
    assert!(auth.error().is_none());
}

#[test]
fn login_without_a_user_in_the_response_falls_back_to_generic_message() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).json_body(json!({
            "ok": true,
            "accessToken": "token-abc",
        }));
    });

    let mut auth = manager(&server, &store);
    let error = auth
        .login("user@example.com", "secret-1")
        .expect_err("missing user");

    assert_eq!(error.message, "login failed");
    assert!(!auth.is_authenticated());
}

#[test]
fn login_http_failure_surfaces_the_error_body() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(500).json_body(json!({"error": "temporarily unavailable"}));
    });

    let mut auth = manager(&server, &store);
    let error = auth
        .login("user@example.com", "secret-1")
        .expect_err("server error");

    assert_eq!(error.kind, ErrorKind::Api);
    assert!(error.message.contains("temporarily unavailable"));
    assert_eq!(auth.error(), Some(error.message.as_str()));
}

#[test]
fn validation_failures_do_not_reach_the_network() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    let login = server.mock(|when, then| {
        when.method(POST).path("/login");
        then.status(200).json_body(json!({"ok": true}));
    });

    let mut auth = manager(&server, &store);

    let error = auth.login("   ", "secret").expect_err("empty email");
    assert_eq!(error.kind, ErrorKind::Usage);

    let error = auth.login("user@example.com", "").expect_err("empty password");
    assert_eq!(error.kind, ErrorKind::Usage);

    login.assert_hits(0);
}

#[test]
fn register_success_behaves_like_login() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    let register = server.mock(|when, then| {
        when.method(POST).path("/register").json_body(json!({
            "email": "new@example.com",
            "password": "secret-1",
            "name": "Нов клиент",
        }));
        then.status(200).json_body(json!({
            "ok": true,
            "user": { "id": 9, "email": "new@example.com", "name": "Нов клиент" },
            "accessToken": "token-new",
        }));
    });

    let mut auth = manager(&server, &store);
    auth.register("new@example.com", "secret-1", "Нов клиент")
        .expect("register");

    register.assert_hits(1);
    assert!(auth.is_authenticated());
    assert_eq!(auth.session().token(), Some("token-new"));
}

#[test]
fn register_rejection_uses_the_register_fallback_message() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    server.mock(|when, then| {
        when.method(POST).path("/register");
        then.status(200).json_body(json!({"ok": false}));
    });

    let mut auth = manager(&server, &store);
    let error = auth
        .register("new@example.com", "secret-1", "Нов клиент")
        .expect_err("rejected");

    assert_eq!(error.message, "registration failed");
}

#[test]
fn logout_clears_the_persisted_session_without_a_network_call() {
    let server = MockServer::start();
    let (_temp, store) = session_store();

    store
        .save(&Session::authenticated(
            UserData {
                id: Some(7),
                email: Some("user@example.com".to_string()),
                name: None,
            },
            Some("token-abc".to_string()),
        ))
        .expect("seed session");

    let mut auth = manager(&server, &store);
    assert!(auth.is_authenticated(), "session loaded at construction");

    auth.logout().expect("logout");

    assert!(!auth.is_authenticated());
    assert!(auth.session().token().is_none());

    let persisted = store.load().expect("load").expect("cleared blob persisted");
    assert!(!persisted.is_authenticated());
    assert!(persisted.token().is_none());
}
