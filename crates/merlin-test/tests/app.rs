//! A small application exercised end to end through the test client.

use http::header::{HeaderName, HeaderValue};
use http::Method;
use merlin_core::{ApiResponse, Context};
use merlin_middleware::stages::{cors, jwt, recovery, RequestIdMiddleware, TokenError, CLAIMS_KEY};
use merlin_middleware::from_fn;
use merlin_server::{Server, ServerConfig};
use merlin_test::TestClient;
use serde_json::{json, Value};

fn verify(token: &str) -> Result<Value, TokenError> {
    match token {
        "admin-token" => Ok(json!({"sub": "root"})),
        _ => Err(TokenError::Invalid("unknown".into())),
    }
}

fn app() -> TestClient {
    let config = ServerConfig::builder().method_not_allowed(true).build();
    let mut server = Server::new(config);
    server.use_middleware(recovery());
    server.use_middleware(RequestIdMiddleware::new());
    server.use_if("/api/*", cors()).unwrap();

    server
        .get("/health", |_ctx: &mut Context| ApiResponse::ok("healthy"))
        .unwrap();
    server
        .get("/boom", |_ctx: &mut Context| -> ApiResponse { panic!("handler exploded") })
        .unwrap();

    let mut api = server.group("/api");
    api.get("/items/:id", |ctx: &mut Context| {
        let id = ctx.param("id").unwrap_or_default().to_string();
        ApiResponse::ok("item").with_details(json!({"id": id}))
    })
    .unwrap();
    api.put("/items/:id", |_ctx: &mut Context| ApiResponse::ok("updated"))
        .unwrap();
    api.get("/reports", |_ctx: &mut Context| ApiResponse::ok("reports"))
        .unwrap();
    api.handle(Method::OPTIONS, "/reports", |_ctx: &mut Context| {
        ApiResponse::ok("unreachable behind cors")
    })
    .unwrap();

    let mut admin = api.group("/admin");
    admin.use_middleware(jwt(verify));
    admin.use_middleware(from_fn("audit", |ctx, next| {
        ctx.set_header(HeaderName::from_static("x-audited"), HeaderValue::from_static("yes"));
        next.run(ctx)
    }));
    admin
        .get("/whoami", |ctx: &mut Context| {
            let sub = ctx
                .get(CLAIMS_KEY)
                .and_then(|claims| claims["sub"].as_str())
                .unwrap_or_default()
                .to_string();
            ApiResponse::ok(sub)
        })
        .unwrap();

    TestClient::from_server(server)
}

#[test]
fn plain_route_completes_envelope() {
    let response = app().get("/health").send();
    response
        .assert_status(200)
        .assert_header("content-type", "application/json")
        .assert_json_eq(&json!({"success": true, "message": "healthy", "code": 200}));
    assert!(response.header("x-request-id").is_some());
    assert!(response.header("access-control-allow-credentials").is_none());
}

#[test]
fn conditional_cors_applies_under_prefix() {
    let response = app()
        .get("/api/items/7")
        .header("origin", "https://app.example")
        .send();
    response
        .assert_status(200)
        .assert_header("access-control-allow-origin", "https://app.example")
        .assert_header("access-control-allow-credentials", "true");
    assert_eq!(response.envelope().unwrap().details, Some(json!({"id": "7"})));
}

#[test]
fn unregistered_method_lists_allowed_ones() {
    let response = app().options("/api/items/7").send();
    response.assert_status(405).assert_header("allow", "GET, PUT");
}

#[test]
fn preflight_is_answered_on_paths_with_an_options_route() {
    let response = app()
        .options("/api/reports")
        .header("origin", "https://app.example")
        .send();
    response
        .assert_status(204)
        .assert_header("access-control-allow-origin", "https://app.example");
    assert!(response.header("access-control-allow-methods").is_some());
    assert!(response.body().is_empty());

    let response = app().options("/api/items/7").send();
    response.assert_status(405);
    assert!(response.header("access-control-allow-methods").is_none());
}

#[test]
fn unknown_path_is_not_found_without_middleware() {
    let response = app().get("/nowhere").send();
    response.assert_status(404);
    assert_eq!(response.envelope().unwrap().message, "Not Found");
    assert!(response.header("x-request-id").is_none());
}

#[test]
fn nested_group_requires_token() {
    let client = app();

    let denied = client.get("/api/admin/whoami").send();
    denied.assert_status(401);
    assert_eq!(denied.envelope().unwrap().message, "Missing token");
    assert!(denied.header("x-audited").is_none());
    assert_eq!(denied.header("access-control-allow-credentials"), Some("true"));

    let allowed = client
        .get("/api/admin/whoami")
        .bearer_token("admin-token")
        .send();
    allowed.assert_status(200).assert_header("x-audited", "yes");
    assert_eq!(allowed.envelope().unwrap().message, "root");
}

#[test]
fn panics_become_500() {
    let response = app().get("/boom").send();
    response.assert_status(500);
    assert_eq!(
        response.envelope().unwrap(),
        ApiResponse::error("Internal Server Error", 500)
    );
    assert!(response.header("x-request-id").is_some());
}

#[test]
fn incoming_request_id_is_kept() {
    let id = "0192b1a4-7d2e-7c3f-9a10-5f3e2d1c0b9a";
    let response = app().get("/health").header("x-request-id", id).send();
    response.assert_header("x-request-id", id);
}
