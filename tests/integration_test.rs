use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use predicates::prelude::*;

const KEY: &str = "integration-key-7c1d";
const TOKEN: &str = "integration-token-e83b";

/// The binary pointed at `url`, with test credentials and fast retries.
fn trelloctl(url: &str) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("trelloctl"));
    for key in [
        "TRELLO_MAX_RETRIES",
        "TRELLO_MAX_DELAY_MS",
        "TRELLO_RETRY_JITTER",
        "TRELLO_TIMEOUT_MS",
    ] {
        cmd.env_remove(key);
    }
    cmd.env("TRELLO_API_KEY", KEY)
        .env("TRELLO_TOKEN", TOKEN)
        .env("TRELLO_API_URL", url)
        .env("TRELLO_BASE_DELAY_MS", "10");
    cmd
}

fn credentials() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("key".into(), KEY.into()),
        Matcher::UrlEncoded("token".into(), TOKEN.into()),
    ])
}

#[test]
fn test_boards() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/members/me/boards")
        .match_query(credentials())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-rate-limit-limit", "100")
        .with_header("x-rate-limit-remaining", "99")
        .with_body(r#"[{"id": "b1", "name": "Roadmap"}, {"id": "b2", "name": "Operations"}]"#)
        .create();

    trelloctl(&server.url())
        .arg("boards")
        .assert()
        .success()
        .stdout("b1  Roadmap\nb2  Operations\n")
        .stderr(predicate::str::contains("rate limit: 99/100"));

    mock.assert();
}

#[test]
fn test_not_found_fails_without_leaking_credentials() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/cards/missing")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body("The requested resource was not found.")
        .expect(1)
        .create();

    trelloctl(&server.url())
        .args(["card", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Resource not found"))
        .stderr(predicate::str::contains(TOKEN).not())
        .stderr(predicate::str::contains(KEY).not());

    mock.assert();
}

#[test]
fn test_missing_credentials() {
    Command::new(cargo::cargo_bin!("trelloctl"))
        .env_remove("TRELLO_API_KEY")
        .env_remove("TRELLO_TOKEN")
        .arg("boards")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TRELLO_API_KEY is not set"));
}

#[test]
fn test_server_error_is_retried() {
    let mut server = Server::new();
    let unavailable = server
        .mock("GET", "/members/me")
        .match_query(credentials())
        .with_status(503)
        .expect(1)
        .create();
    let ok = server
        .mock("GET", "/members/me")
        .match_query(credentials())
        .with_status(200)
        .with_body(r#"{"id": "m1", "username": "alice"}"#)
        .expect(1)
        .create();

    trelloctl(&server.url())
        .arg("me")
        .assert()
        .success()
        .stdout("m1  alice\n");

    unavailable.assert();
    ok.assert();
}

#[test]
fn test_max_retries_flag_limits_attempts() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/members/me/boards")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create();

    trelloctl(&server.url())
        .args(["--max-retries", "0", "boards"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server error (HTTP 500)"));

    mock.assert();
}

#[test]
fn test_create_card() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/cards")
        .match_query(credentials())
        .match_body(Matcher::Json(serde_json::json!({
            "idList": "l1",
            "name": "Ship it",
            "due": "2024-05-01T12:00:00Z"
        })))
        .with_status(200)
        .with_body(r#"{"id": "c1", "name": "Ship it", "idList": "l1"}"#)
        .create();

    trelloctl(&server.url())
        .args(["create-card", "l1", "Ship it", "--due", "2024-05-01T12:00:00Z"])
        .assert()
        .success()
        .stdout("c1  Ship it\n");

    mock.assert();
}
