use std::sync::Arc;

use dropgate_core::auth::{ExecutionContext, RequestCookieStore};
use dropgate_core::gate::{GateDecision, GateRequest, Gatekeeper, RouteTable};
use dropgate_core::ApiClient;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gatekeeper(server: &MockServer) -> Gatekeeper {
    let api = ApiClient::new(
        server.uri(),
        ExecutionContext::Server,
        Arc::new(RequestCookieStore::default()),
    )
    .expect("client should build");
    Gatekeeper::new(api, RouteTable::default())
}

async fn mount_me(server: &MockServer, token: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_refresh(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn expect_no_backend_calls(server: &MockServer) {
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_assets_pass_through_regardless_of_cookies() {
    let server = MockServer::start().await;
    expect_no_backend_calls(&server).await;
    let gate = gatekeeper(&server);

    for request in [
        GateRequest::new("/favicon.ico"),
        GateRequest::new("/vendor/logo.png").with_cookies("accessToken=expired; refreshToken=r0"),
        GateRequest::new("/_next/static/app.js").with_cookies("accessToken=acc"),
    ] {
        let response = gate.evaluate(&request).await;
        assert!(response.is_next(), "{}", request.path);
        assert!(response.cookies.is_empty());
    }
}

#[tokio::test]
async fn test_framework_routes_are_not_gated() {
    let server = MockServer::start().await;
    expect_no_backend_calls(&server).await;
    let gate = gatekeeper(&server);

    let response = gate.evaluate(&GateRequest::new("/api/webhooks")).await;
    assert!(response.is_next());
}

#[tokio::test]
async fn test_anonymous_user_is_sent_to_sign_in_with_next() {
    let server = MockServer::start().await;
    expect_no_backend_calls(&server).await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/vendor/orders").with_query("status=active"))
        .await;
    assert_eq!(
        response.location(),
        Some("/auth/signin?next=%2Fvendor%2Forders%3Fstatus%3Dactive")
    );
    assert!(response.cookies.is_empty());

    let response = gate.evaluate(&GateRequest::new("/dashboard")).await;
    assert_eq!(response.location(), Some("/auth/signin?next=%2Fdashboard"));
}

#[tokio::test]
async fn test_anonymous_user_reaches_auth_pages() {
    let server = MockServer::start().await;
    expect_no_backend_calls(&server).await;
    let gate = gatekeeper(&server);

    for page in ["/", "/auth/signin", "/auth/signup", "/auth/verify-otp"] {
        let response = gate.evaluate(&GateRequest::new(page)).await;
        assert!(response.is_next(), "{}", page);
    }
}

#[tokio::test]
async fn test_vendor_on_sign_in_goes_to_vendor_home() {
    let server = MockServer::start().await;
    mount_me(&server, "acc", 200, json!({"isVendor": true, "isAgent": false})).await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/auth/signin").with_cookies("accessToken=acc"))
        .await;
    assert_eq!(response.decision, GateDecision::Redirect("/vendor".into()));
    assert!(response.cookies.is_empty());
}

#[tokio::test]
async fn test_agent_on_landing_page_goes_to_agent_home() {
    let server = MockServer::start().await;
    mount_me(&server, "acc", 200, json!({"isVendor": false, "isAgent": true})).await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/").with_cookies("accessToken=acc"))
        .await;
    assert_eq!(response.location(), Some("/agent"));
}

#[tokio::test]
async fn test_role_scoped_pages_pass_for_matching_role() {
    let server = MockServer::start().await;
    mount_me(&server, "acc", 200, json!({"isVendor": true})).await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/vendor/requests").with_cookies("accessToken=acc"))
        .await;
    assert!(response.is_next());

    let response = gate
        .evaluate(&GateRequest::new("/agent/wallet").with_cookies("accessToken=acc"))
        .await;
    assert_eq!(response.location(), Some("/vendor"));
}

#[tokio::test]
async fn test_rotation_survives_role_redirect() {
    let server = MockServer::start().await;
    mount_me(&server, "old", 401, json!({"message": "Token expired"})).await;
    mount_me(&server, "new", 200, json!({"isVendor": false, "isAgent": true})).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .and(header("authorization", "Bearer old"))
        .and(body_json(json!({"refreshToken": "r0"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "new", "refreshToken": "r1"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(
            &GateRequest::new("/vendor/anything")
                .with_cookies("accessToken=old; refreshToken=r0")
                .secure(true),
        )
        .await;

    assert_eq!(response.location(), Some("/agent"));
    let access = response.cookie("accessToken").expect("rotated access cookie");
    let refresh = response.cookie("refreshToken").expect("rotated refresh cookie");
    assert_eq!(
        access.header_value(),
        "accessToken=new; Path=/; Max-Age=7200; SameSite=Lax; Secure"
    );
    assert_eq!(
        refresh.header_value(),
        "refreshToken=r1; Path=/; Max-Age=604800; SameSite=Lax; Secure"
    );
}

#[tokio::test]
async fn test_rotation_on_pass_through() {
    let server = MockServer::start().await;
    mount_me(&server, "old", 401, json!({"message": "Token expired"})).await;
    mount_me(&server, "new", 200, json!({"isVendor": true})).await;
    mount_refresh(&server, 200, json!({"accessToken": "new", "refreshToken": "r1"})).await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/vendor").with_cookies("accessToken=old; refreshToken=r0"))
        .await;

    assert!(response.is_next());
    assert_eq!(response.cookies.len(), 2);
    assert!(!response.cookies[0].secure);
}

#[tokio::test]
async fn test_post_refresh_identity_drives_gating() {
    let server = MockServer::start().await;
    mount_me(&server, "old", 401, json!({})).await;
    mount_me(&server, "new", 200, json!({"isVendor": true})).await;
    mount_refresh(&server, 200, json!({"accessToken": "new", "refreshToken": "r1"})).await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/auth/signup").with_cookies("accessToken=old; refreshToken=r0"))
        .await;
    assert_eq!(response.location(), Some("/vendor"));
    assert_eq!(response.cookies.len(), 2);
}

#[tokio::test]
async fn test_failed_refresh_sends_to_sign_in() {
    let server = MockServer::start().await;
    mount_me(&server, "old", 401, json!({"message": "Token expired"})).await;
    mount_refresh(&server, 401, json!({"message": "Refresh expired"})).await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(
            &GateRequest::new("/agent/orders")
                .with_query("id=42")
                .with_cookies("accessToken=old; refreshToken=r0"),
        )
        .await;
    assert_eq!(
        response.location(),
        Some("/auth/signin?next=%2Fagent%2Forders%3Fid%3D42")
    );
    assert!(response.cookies.is_empty());
}

#[tokio::test]
async fn test_missing_refresh_credential_sends_to_sign_in() {
    let server = MockServer::start().await;
    mount_me(&server, "old", 401, json!({"message": "Token expired"})).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/vendor").with_cookies("accessToken=old"))
        .await;
    assert_eq!(response.location(), Some("/auth/signin?next=%2Fvendor"));
}

#[tokio::test]
async fn test_backend_error_is_soft() {
    let server = MockServer::start().await;
    mount_me(&server, "acc", 503, json!({"message": "maintenance"})).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-tokens"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/vendor").with_cookies("accessToken=acc; refreshToken=r0"))
        .await;
    assert_eq!(response.location(), Some("/auth/signin?next=%2Fvendor"));

    // No redirect loop on the sign-in page itself.
    let response = gate
        .evaluate(&GateRequest::new("/auth/signin").with_cookies("accessToken=acc"))
        .await;
    assert!(response.is_next());
}

#[tokio::test]
async fn test_unreachable_backend_is_soft() {
    let api = ApiClient::new(
        "http://127.0.0.1:1",
        ExecutionContext::Server,
        Arc::new(RequestCookieStore::default()),
    )
    .unwrap();
    let gate = Gatekeeper::new(api, RouteTable::default());

    let response = gate
        .evaluate(&GateRequest::new("/agent").with_cookies("accessToken=acc"))
        .await;
    assert_eq!(response.location(), Some("/auth/signin?next=%2Fagent"));
}

#[tokio::test]
async fn test_rotation_kept_when_identity_fails_after_refresh() {
    let server = MockServer::start().await;
    mount_me(&server, "old", 401, json!({})).await;
    mount_me(&server, "new", 500, json!({"message": "boom"})).await;
    mount_refresh(&server, 200, json!({"accessToken": "new", "refreshToken": "r1"})).await;
    let gate = gatekeeper(&server);

    let response = gate
        .evaluate(&GateRequest::new("/vendor").with_cookies("accessToken=old; refreshToken=r0"))
        .await;
    assert_eq!(response.location(), Some("/auth/signin?next=%2Fvendor"));
    assert!(response.cookie("accessToken").is_some());
    assert!(response.cookie("refreshToken").is_some());
}
