//! End-to-end tests of the REST endpoints over an in-memory store.

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use mist_server::{ApiServer, ServerConfig, API_TOKEN_HEADER};
use mist_store::{StoreConfig, OWNER_FIELD};
use mist_testkit::{temp_file, TestStore, GOOGLE_CSV, NOTES_XML, TEST_DATABASE};
use serde_json::{json, Value};

struct Api {
    server: ApiServer,
    store: TestStore,
}

impl Api {
    fn new() -> Self {
        let store = TestStore::memory();
        let config = ServerConfig::new(
            StoreConfig::new()
                .host("localhost")
                .port(27017)
                .database(TEST_DATABASE),
        )
        .with_secret("integration-secret");
        let server = ApiServer::new(config, store.store.clone());
        Self { server, store }
    }

    fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        headers: &[(http::header::HeaderName, &str)],
        body: &[u8],
    ) -> Response<Vec<u8>> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            request = request.header(name, *value);
        }
        self.server.handle(request.body(body.to_vec()).unwrap())
    }

    fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> Response<Vec<u8>> {
        self.send(
            method,
            uri,
            token,
            &[(CONTENT_TYPE, "application/json")],
            body.to_string().as_bytes(),
        )
    }

    fn get(&self, uri: &str, token: &str) -> Response<Vec<u8>> {
        self.send(Method::GET, uri, Some(token), &[], b"")
    }

    /// Registers `login` and returns its token and user id.
    fn user(&self, login: &str) -> (String, String) {
        let registered = self.json(
            Method::POST,
            "/user",
            None,
            json!({"login": login, "password": "pw", "email": format!("{login}@example.org")}),
        );
        assert_eq!(registered.status(), StatusCode::OK);
        let id = body(&registered)["_id"].as_str().unwrap().to_string();

        let logged = self.json(
            Method::POST,
            "/user/login",
            None,
            json!({"login": login, "password": "pw"}),
        );
        assert_eq!(logged.status(), StatusCode::OK);
        let token = body(&logged)["token"].as_str().unwrap().to_string();
        (token, id)
    }
}

fn body(response: &Response<Vec<u8>>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

#[test]
fn register_login_and_profile() {
    let api = Api::new();

    let registered = api.json(
        Method::POST,
        "/user",
        None,
        json!({"login": "ada", "password": "pw", "_id": "forged"}),
    );
    assert_eq!(registered.status(), StatusCode::OK);
    let user = body(&registered);
    assert_eq!(user["login"], "ada");
    assert!(user.get("password").is_none());
    assert_ne!(user["_id"], "forged");

    let duplicate = api.json(Method::POST, "/user", None, json!({"login": "ada", "password": "x"}));
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let refused = api.json(
        Method::POST,
        "/user/login",
        None,
        json!({"login": "ada", "password": "wrong"}),
    );
    assert_eq!(refused.status(), StatusCode::UNAUTHORIZED);
    assert!(body(&refused)["error"].is_string());

    let logged = api.json(
        Method::POST,
        "/user/login",
        None,
        json!({"login": "ada", "password": "pw"}),
    );
    assert_eq!(logged.status(), StatusCode::OK);
    let session = body(&logged);
    assert!(session["expires"].as_i64().unwrap() > 0);
    assert!(session["user"].get("password").is_none());
    let token = session["token"].as_str().unwrap();

    let me = api.get("/user", token);
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body(&me)["login"], "ada");
}

#[test]
fn profile_update_and_removal() {
    let api = Api::new();
    let (token, _) = api.user("grace");
    api.user("alan");

    let updated = api.json(
        Method::PATCH,
        "/user",
        Some(&token),
        json!({"password": "new", "nickname": "Amazing Grace"}),
    );
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(body(&updated)["nickname"], "Amazing Grace");
    assert!(body(&updated).get("password").is_none());

    let old = api.json(
        Method::POST,
        "/user/login",
        None,
        json!({"login": "grace", "password": "pw"}),
    );
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);
    let new = api.json(
        Method::POST,
        "/user/login",
        None,
        json!({"login": "grace", "password": "new"}),
    );
    assert_eq!(new.status(), StatusCode::OK);

    let taken = api.json(Method::PATCH, "/user", Some(&token), json!({"login": "alan"}));
    assert_eq!(taken.status(), StatusCode::CONFLICT);

    let removed = api.send(Method::DELETE, "/user", Some(&token), &[], b"");
    assert_eq!(removed.status(), StatusCode::OK);
    assert_eq!(body(&removed), json!(1));
    assert_eq!(api.get("/user", &token).status(), StatusCode::NOT_FOUND);
}

#[test]
fn tokens_are_required() {
    let api = Api::new();
    let (token, _) = api.user("ada");

    let anonymous = api.send(Method::GET, "/note", None, &[], b"");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let garbage = api.get("/note", "not.a.token");
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

    let mut tampered = token.clone();
    tampered.push('x');
    assert_eq!(api.get("/note", &tampered).status(), StatusCode::UNAUTHORIZED);

    let other_secret = ServerConfig::default()
        .with_secret("another secret")
        .auth_config();
    let forged = mist_server::TokenValidator::new(other_secret)
        .create_token(&mist_store::ObjectId::new().to_hex())
        .unwrap();
    assert_eq!(api.get("/note", &forged.token).status(), StatusCode::UNAUTHORIZED);

    let via_header = api.send(
        Method::GET,
        "/note",
        None,
        &[(http::header::HeaderName::from_static(API_TOKEN_HEADER), token.as_str())],
        b"",
    );
    assert_eq!(via_header.status(), StatusCode::OK);
}

#[test]
fn note_lifecycle() {
    let api = Api::new();
    let (token, owner) = api.user("ada");
    let (intruder, _) = api.user("mallory");

    let created = api.json(
        Method::POST,
        "/note",
        Some(&token),
        json!({"title": "draft", "_user": "forged", "_id": "forged"}),
    );
    assert_eq!(created.status(), StatusCode::OK);
    let note = body(&created);
    assert_eq!(note[OWNER_FIELD], owner.as_str());
    let id = note["_id"].as_str().unwrap().to_string();
    let uri = format!("/note/{id}");

    assert_eq!(api.get(&uri, &token).status(), StatusCode::OK);
    assert_eq!(api.get(&uri, &intruder).status(), StatusCode::NOT_FOUND);
    assert_eq!(api.get("/note/not-an-id", &token).status(), StatusCode::NOT_FOUND);

    // Same value twice: the second update changes nothing.
    let conflict = api.json(Method::PATCH, &uri, Some(&token), json!({"title": "draft"}));
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    assert_eq!(body(&conflict)["_id"], id.as_str());

    let updated = api.json(Method::PATCH, &uri, Some(&token), json!({"title": "final"}));
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(body(&updated), json!(1));

    let stolen = api.json(Method::PATCH, &uri, Some(&intruder), json!({"title": "mine"}));
    assert_eq!(stolen.status(), StatusCode::NOT_FOUND);

    // PUT merges like PATCH: fields left out are kept.
    let merged = api.json(
        Method::PUT,
        &uri,
        Some(&token),
        json!({"body": "rewritten", "_user": "forged"}),
    );
    assert_eq!(merged.status(), StatusCode::OK);
    let current = body(&api.get(&uri, &token));
    assert_eq!(current["body"], "rewritten");
    assert_eq!(current["title"], "final");
    assert_eq!(current[OWNER_FIELD], owner.as_str());

    let unchanged = api.json(Method::PUT, &uri, Some(&token), json!({"body": "rewritten"}));
    assert_eq!(unchanged.status(), StatusCode::CONFLICT);
    assert_eq!(body(&unchanged)["title"], "final");

    assert_eq!(
        api.send(Method::DELETE, &uri, Some(&intruder), &[], b"").status(),
        StatusCode::NOT_FOUND
    );
    let removed = api.send(Method::DELETE, &uri, Some(&token), &[], b"");
    assert_eq!(removed.status(), StatusCode::OK);
    assert_eq!(
        api.send(Method::DELETE, &uri, Some(&token), &[], b"").status(),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn bulk_insert_and_listing_are_scoped() {
    let api = Api::new();
    let (ada, _) = api.user("ada");
    let (grace, _) = api.user("grace");

    let inserted = api.json(
        Method::POST,
        "/note",
        Some(&ada),
        json!([{"title": "a"}, {"title": "b"}]),
    );
    assert_eq!(inserted.status(), StatusCode::OK);
    assert_eq!(body(&inserted).as_array().unwrap().len(), 2);

    assert_eq!(body(&api.get("/note", &ada)).as_array().unwrap().len(), 2);
    assert_eq!(body(&api.get("/note", &grace)), json!([]));

    let malformed = api.send(
        Method::POST,
        "/note",
        Some(&ada),
        &[(CONTENT_TYPE, "application/json")],
        b"{oops",
    );
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn contact_import() {
    let api = Api::new();
    let (token, _) = api.user("ada");

    let imported = api.send(
        Method::POST,
        "/contact/import",
        Some(&token),
        &[(CONTENT_TYPE, "text/csv-google")],
        GOOGLE_CSV.as_bytes(),
    );
    assert_eq!(imported.status(), StatusCode::OK);
    // Three contacts plus the Family, Science and Navy groups.
    assert_eq!(body(&imported).as_array().unwrap().len(), 6);

    // Importing again creates the contacts but no new group.
    let again = api.send(
        Method::POST,
        "/contact/import",
        Some(&token),
        &[(CONTENT_TYPE, "text/csv-google")],
        GOOGLE_CSV.as_bytes(),
    );
    assert_eq!(body(&again).as_array().unwrap().len(), 3);
    assert_eq!(body(&api.get("/contact", &token)).as_array().unwrap().len(), 9);

    let unsupported = api.send(
        Method::POST,
        "/contact/import",
        Some(&token),
        &[(CONTENT_TYPE, "text/plain")],
        b"whatever",
    );
    assert_eq!(unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let ragged = api.send(
        Method::POST,
        "/contact/import",
        Some(&token),
        &[(CONTENT_TYPE, "text/csv-google")],
        b"Given Name,Family Name\nAda\n",
    );
    assert_eq!(ragged.status(), StatusCode::BAD_REQUEST);
    assert_eq!(api.store.count("contact"), 9);
}

#[test]
fn note_import_and_export() {
    let api = Api::new();
    let (token, _) = api.user("ada");

    let imported = api.send(
        Method::POST,
        "/note/import",
        Some(&token),
        &[(CONTENT_TYPE, "application/xml")],
        NOTES_XML.as_bytes(),
    );
    assert_eq!(imported.status(), StatusCode::OK);

    let json_export = api.send(Method::GET, "/note/export", Some(&token), &[], b"");
    assert_eq!(json_export.status(), StatusCode::OK);
    assert_eq!(json_export.headers()[CONTENT_TYPE], "application/json");
    let notes = body(&json_export);
    assert_eq!(notes.as_array().unwrap().len(), 2);
    assert!(!String::from_utf8_lossy(json_export.body()).contains("\"_"));

    let xml_export = api.send(
        Method::GET,
        "/note/export",
        Some(&token),
        &[(ACCEPT, "text/xml")],
        b"",
    );
    assert_eq!(xml_export.status(), StatusCode::OK);
    assert_eq!(xml_export.headers()[CONTENT_TYPE], "application/xml");
    let xml = String::from_utf8(xml_export.body().clone()).unwrap();
    assert!(xml.contains("<notes><note>"));
    assert!(!xml.contains("<_id>"));

    let refused = api.send(
        Method::GET,
        "/note/export",
        Some(&token),
        &[(ACCEPT, "text/html")],
        b"",
    );
    assert_eq!(refused.status(), StatusCode::NOT_ACCEPTABLE);

    // The XML export imports back as the same notes.
    let (other, _) = api.user("grace");
    let reimported = api.send(
        Method::POST,
        "/note/import",
        Some(&other),
        &[(CONTENT_TYPE, "text/xml")],
        xml.as_bytes(),
    );
    assert_eq!(reimported.status(), StatusCode::OK);
    let exported_again = body(&api.send(Method::GET, "/note/export", Some(&other), &[], b""));
    assert_eq!(exported_again, notes);
}

#[test]
fn unavailable_database_is_503() {
    let api = Api::new();
    let (token, _) = api.user("ada");

    api.store.set_online(false);
    let response = api.get("/note", &token);
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body(&response)["error"].as_str().unwrap().contains(TEST_DATABASE));

    api.store.set_online(true);
    assert_eq!(api.get("/note", &token).status(), StatusCode::OK);
}

#[test]
fn bootstrap_from_config_file() {
    let file = temp_file(
        r#"{
            "server": {"host": "127.0.0.1", "port": 8080},
            "database": {"host": "localhost", "port": 27017, "database": ["mist", "archive"], "defaultDatabase": "mist"},
            "auth": {"secret": "from-file", "tokenExpiryDays": 1}
        }"#,
    );
    let server = ApiServer::bootstrap_from(&[file.path()], mist_store::Store::in_memory()).unwrap();

    assert_eq!(server.config().server.port, 8080);
    assert!(server.store().is_open("mist"));
    assert!(server.store().is_open("archive"));
    assert_eq!(
        server.tokens().token_expiry(),
        std::time::Duration::from_secs(24 * 60 * 60)
    );

    server.shutdown().unwrap();
    assert!(server.store().databases().is_empty());
}
