use carta_api::{StorefrontApi, UserData, VirtualCardRequest};
use carta_core::ErrorKind;
use carta_state::{CardManager, ScanOutcome};
use carta_store::Session;
use httpmock::Method::{DELETE, GET, POST};
use httpmock::MockServer;
use serde_json::json;

fn authed() -> Session {
    Session::authenticated(
        UserData {
            id: Some(7),
            email: Some("user@example.com".to_string()),
            name: None,
        },
        Some("token-abc".to_string()),
    )
}

fn manager(server: &MockServer) -> CardManager {
    let api = StorefrontApi::new(&server.base_url()).expect("api client");
    CardManager::new(api)
}

#[test]
fn load_is_silently_skipped_without_a_session() {
    let server = MockServer::start();
    let cards = server.mock(|when, then| {
        when.method(GET).path("/client-cards");
        then.status(200).json_body(json!({}));
    });

    let mut manager = manager(&server);
    manager.load(&Session::default()).expect("no-op load");

    cards.assert_hits(0);
    assert!(manager.card().is_none());
}

#[test]
fn load_replaces_card_state_and_virtual_hints() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/client-cards")
            .header("authorization", "Bearer token-abc");
        then.status(200).json_body(json!({
            "card": { "ccnum": "123456789" },
            "virtual_available": true,
            "virtual_ccnum": "987654321",
        }));
    });

    let mut manager = manager(&server);
    manager.load(&authed()).expect("load");

    assert_eq!(manager.card().map(|card| card.ccnum.as_str()), Some("123456789"));
    assert!(manager.virtual_available());
    assert_eq!(manager.virtual_ccnum(), Some("987654321"));
}

#[test]
fn load_failure_reports_a_generic_message_and_keeps_state() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/client-cards");
        then.status(500).body("boom");
    });

    let mut manager = manager(&server);
    let error = manager.load(&authed()).expect_err("load should fail");

    assert_eq!(error.kind, ErrorKind::Api);
    assert_eq!(error.message, "failed to load the client card");
    assert!(manager.card().is_none());
}

#[test]
fn save_card_normalizes_input_and_refreshes_hints() {
    let server = MockServer::start();

    let set = server.mock(|when, then| {
        when.method(POST)
            .path("/client-cards")
            .json_body(json!({"ccnum": "123456"}));
        then.status(200).json_body(json!({"card": {"ccnum": "123456"}}));
    });
    let refresh = server.mock(|when, then| {
        when.method(GET).path("/client-cards");
        then.status(200).json_body(json!({
            "card": { "ccnum": "123456" },
            "virtual_available": true,
        }));
    });

    let mut manager = manager(&server);
    manager.save_card(&authed(), "12-34 56").expect("save card");

    set.assert_hits(1);
    refresh.assert_hits(1);
    assert_eq!(manager.card().map(|card| card.ccnum.as_str()), Some("123456"));
    assert!(manager.virtual_available());
    assert!(!manager.is_saving());
}

#[test]
fn save_card_rejects_short_numbers_without_a_request() {
    let server = MockServer::start();
    let set = server.mock(|when, then| {
        when.method(POST).path("/client-cards");
        then.status(200).json_body(json!({}));
    });

    let mut manager = manager(&server);
    let error = manager.save_card(&authed(), "12a3").expect_err("too short");

    assert_eq!(error.kind, ErrorKind::Usage);
    set.assert_hits(0);
}

#[test]
fn scan_saves_once_and_drops_followup_scans() {
    let server = MockServer::start();

    let set = server.mock(|when, then| {
        when.method(POST)
            .path("/client-cards")
            .json_body(json!({"ccnum": "1234567890123"}));
        then.status(200)
            .json_body(json!({"card": {"ccnum": "1234567890123"}}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/client-cards");
        then.status(200).json_body(json!({"card": {"ccnum": "1234567890123"}}));
    });

    let mut manager = manager(&server);
    let session = authed();

    let first = manager
        .handle_scan(&session, "1234567890123")
        .expect("first scan");
    assert_eq!(first, ScanOutcome::Saved);

    let second = manager
        .handle_scan(&session, "1234567890123")
        .expect("second scan");
    assert_eq!(second, ScanOutcome::Ignored);

    set.assert_hits(1);

    // Reopening the scanner accepts a fresh code again.
    manager.rearm_scanner();
    let third = manager
        .handle_scan(&session, "1234567890123")
        .expect("third scan");
    assert_eq!(third, ScanOutcome::Saved);
    set.assert_hits(2);
}

#[test]
fn failed_scan_save_surfaces_the_server_message_and_rearms() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/client-cards");
        then.status(422).json_body(json!({"error": "card not recognized"}));
    });

    let mut manager = manager(&server);
    let session = authed();

    let error = manager
        .handle_scan(&session, "1234567890123")
        .expect_err("save should fail");
    assert!(error.message.contains("card not recognized"));

    assert!(manager.scanner_armed(), "failure re-arms scanning");
    assert!(!manager.is_saving());
}

#[test]
fn remove_card_is_pessimistic() {
    let server = MockServer::start();

    let load = server.mock(|when, then| {
        when.method(GET).path("/client-cards");
        then.status(200).json_body(json!({"card": {"ccnum": "123456789"}}));
    });
    let mut remove = server.mock(|when, then| {
        when.method(DELETE).path("/client-cards");
        then.status(500).body("boom");
    });

    let mut manager = manager(&server);
    let session = authed();
    manager.load(&session).expect("load");
    load.assert_hits(1);

    let error = manager.remove_card(&session).expect_err("remove should fail");
    assert_eq!(error.message, "failed to remove the client card");
    assert_eq!(
        manager.card().map(|card| card.ccnum.as_str()),
        Some("123456789"),
        "no optimistic removal"
    );

    remove.delete();
    server.mock(|when, then| {
        when.method(DELETE).path("/client-cards");
        then.status(204);
    });

    manager.remove_card(&session).expect("remove");
    assert!(manager.card().is_none());
}

#[test]
fn create_virtual_card_saves_the_issued_number() {
    let server = MockServer::start();

    let create = server.mock(|when, then| {
        when.method(POST).path("/client-cards/virtual");
        then.status(200).json_body(json!({"virtual_ccnum": "555000111"}));
    });
    let set = server.mock(|when, then| {
        when.method(POST)
            .path("/client-cards")
            .json_body(json!({"ccnum": "555000111"}));
        then.status(200).json_body(json!({"card": {"ccnum": "555000111"}}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/client-cards");
        then.status(200).json_body(json!({"card": {"ccnum": "555000111"}}));
    });

    let mut manager = manager(&server);
    let issued = manager
        .create_virtual(&authed(), &valid_form())
        .expect("create virtual");

    create.assert_hits(1);
    set.assert_hits(1);
    assert_eq!(issued.as_deref(), Some("555000111"));
    assert_eq!(
        manager.card().map(|card| card.ccnum.as_str()),
        Some("555000111")
    );
}

#[test]
fn create_virtual_rejects_an_invalid_form_without_a_request() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/client-cards/virtual");
        then.status(200).json_body(json!({}));
    });

    let mut manager = manager(&server);
    let mut form = valid_form();
    form.egn = "12".to_string();

    let error = manager
        .create_virtual(&authed(), &form)
        .expect_err("invalid form");
    assert_eq!(error.kind, ErrorKind::Usage);
    create.assert_hits(0);
}

#[test]
fn existing_virtual_is_silent_on_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/client-cards");
        then.status(500).body("boom");
    });

    let manager = manager(&server);
    assert!(manager.existing_virtual(&authed()).is_none());
}

fn valid_form() -> VirtualCardRequest {
    VirtualCardRequest {
        first_name: "Мария".to_string(),
        middle_name: "Иванова".to_string(),
        last_name: "Петрова".to_string(),
        egn: "8501011234".to_string(),
        post_code: "1000".to_string(),
        phone: "0888123456".to_string(),
        email: "maria@example.com".to_string(),
        consent: true,
        ..VirtualCardRequest::default()
    }
}
