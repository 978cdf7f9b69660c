//! Forward-auth checker against a mock authority.

use std::time::{Duration, Instant};

use http::{HeaderMap, HeaderValue};

use forwardeaz::authz::{
    AuthzError, Checker, ForwardAuthChecker, ForwardAuthConfig, Request,
};

mod common;

fn request(headers: &[(&str, &str)]) -> Request {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.append(
            http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    Request {
        id: Some("req-1".into()),
        method: "GET".into(),
        scheme: "http".into(),
        host: "app.example.com".into(),
        path: "/private".into(),
        query: Some("page=2".into()),
        headers: map,
        tls: false,
    }
}

fn checker(config: ForwardAuthConfig) -> ForwardAuthChecker {
    ForwardAuthChecker::new(config).unwrap()
}

#[tokio::test]
async fn test_outbound_request_carries_forwarded_headers() {
    let authority = common::start_mock_authority(200, &[]).await;
    let checker = checker(ForwardAuthConfig::new(authority.url("/oauth2/auth")));

    let res = checker
        .check(&request(&[("cookie", "s=1")]), None)
        .await
        .unwrap();
    assert!(res.allow);

    let seen = authority.requests();
    assert_eq!(seen.len(), 1);
    let outbound = &seen[0];
    assert_eq!(outbound.method, "GET");
    assert_eq!(outbound.target, "/oauth2/auth");
    assert_eq!(outbound.header("cookie").as_deref(), Some("s=1"));
    assert_eq!(outbound.header("x-forwarded-proto").as_deref(), Some("http"));
    assert_eq!(outbound.header("x-forwarded-method").as_deref(), Some("GET"));
    assert_eq!(
        outbound.header("x-forwarded-host").as_deref(),
        Some("app.example.com")
    );
    assert_eq!(
        outbound.header("x-forwarded-uri").as_deref(),
        Some("/private?page=2")
    );
    assert!(outbound.header("x-forwarded-port").is_none());
}

#[tokio::test]
async fn test_unauthorized_with_location_is_denied() {
    let authority =
        common::start_mock_authority(401, &[("Location", "https://login.example")]).await;
    let checker = checker(ForwardAuthConfig::new(authority.url("/oauth2/auth")));

    let res = checker.check(&request(&[]), None).await.unwrap();

    assert!(!res.allow);
    assert_eq!(res.status_code, 401);
    assert_eq!(res.headers.get("location").unwrap(), "https://login.example");
}

#[tokio::test]
async fn test_allow_copies_allow_listed_headers() {
    let authority = common::start_mock_authority(
        200,
        &[("X-User", "alice"), ("X-Internal", "secret")],
    )
    .await;
    let mut config = ForwardAuthConfig::new(authority.url("/"));
    config.headers.response_headers = vec!["X-User".into()];
    let checker = checker(config);

    let res = checker.check(&request(&[]), None).await.unwrap();

    assert!(res.allow);
    assert_eq!(res.status_code, 200);
    assert_eq!(res.headers.get("x-user").unwrap(), "alice");
}

#[tokio::test]
async fn test_unreachable_authority_is_upstream_error() {
    let addr = common::unused_addr().await;
    let url = url::Url::parse(&format!("http://{}/", addr)).unwrap();
    let checker = checker(ForwardAuthConfig::new(url));

    let err = checker.check(&request(&[]), None).await.unwrap_err();
    assert!(matches!(err, AuthzError::Upstream { .. }));
}

#[tokio::test]
async fn test_request_allow_list_limits_outbound_headers() {
    let authority = common::start_mock_authority(200, &[]).await;
    let mut config = ForwardAuthConfig::new(authority.url("/"));
    config.headers.request_headers = vec!["Authorization".into()];
    let checker = checker(config);

    checker
        .check(
            &request(&[("authorization", "Bearer t"), ("cookie", "s=1")]),
            None,
        )
        .await
        .unwrap();

    let outbound = &authority.requests()[0];
    assert_eq!(outbound.header("authorization").as_deref(), Some("Bearer t"));
    assert!(outbound.header("cookie").is_none());
    assert_eq!(outbound.header("x-forwarded-proto").as_deref(), Some("http"));
}

#[tokio::test]
async fn test_untrusted_forwarded_headers_are_replaced() {
    let authority = common::start_mock_authority(200, &[]).await;
    let mut config = ForwardAuthConfig::new(authority.url("/"));
    config.headers.trust_forward_header = false;
    let checker = checker(config);

    checker
        .check(
            &request(&[
                ("x-forwarded-host", "evil.example"),
                ("x-forwarded-port", "8443"),
            ]),
            None,
        )
        .await
        .unwrap();

    let outbound = &authority.requests()[0];
    assert_eq!(
        outbound.header_values("x-forwarded-host"),
        vec!["app.example.com"]
    );
    assert_eq!(outbound.header("x-forwarded-port").as_deref(), Some("8443"));
}

#[tokio::test]
async fn test_trusted_forwarded_headers_pass_through() {
    let authority = common::start_mock_authority(200, &[]).await;
    let checker = checker(ForwardAuthConfig::new(authority.url("/")));

    checker
        .check(
            &request(&[
                ("x-forwarded-proto", "https"),
                ("x-forwarded-uri", "/original"),
            ]),
            None,
        )
        .await
        .unwrap();

    let outbound = &authority.requests()[0];
    assert_eq!(outbound.header("x-forwarded-proto").as_deref(), Some("https"));
    assert_eq!(outbound.header("x-forwarded-uri").as_deref(), Some("/original"));
}

#[tokio::test]
async fn test_hop_headers_stay_on_their_leg() {
    let authority = common::start_mock_authority(200, &[("Keep-Alive", "timeout=5")]).await;
    let checker = checker(ForwardAuthConfig::new(authority.url("/")));

    let res = checker
        .check(
            &request(&[("proxy-authorization", "Basic x"), ("te", "trailers")]),
            None,
        )
        .await
        .unwrap();

    let outbound = &authority.requests()[0];
    assert!(outbound.header("proxy-authorization").is_none());
    assert!(res.headers.get("keep-alive").is_none());
    assert!(res.headers.get("connection").is_none());
}

#[tokio::test]
async fn test_redirect_is_not_followed() {
    let target = common::start_mock_authority(200, &[]).await;
    let location = format!("http://{}/landing", target.addr);
    let authority = common::start_mock_authority(302, &[("Location", &location)]).await;
    let checker = checker(ForwardAuthConfig::new(authority.url("/")));

    let res = checker.check(&request(&[]), None).await.unwrap();

    assert!(!res.allow);
    assert_eq!(res.status_code, 302);
    assert_eq!(res.headers.get("location").unwrap(), location.as_str());
    assert!(target.requests().is_empty());
}

#[tokio::test]
async fn test_relative_location_is_resolved() {
    let authority =
        common::start_mock_authority(302, &[("Location", "/oauth2/start?rd=%2F")]).await;
    let checker = checker(ForwardAuthConfig::new(authority.url("/oauth2/auth")));

    let res = checker.check(&request(&[]), None).await.unwrap();

    assert_eq!(
        res.headers.get("location").unwrap(),
        format!("http://{}/oauth2/start?rd=%2F", authority.addr).as_str()
    );
}

#[tokio::test]
async fn test_deny_keeps_every_authority_header() {
    let authority = common::start_mock_authority(
        403,
        &[("X-Reason", "expired"), ("Set-Cookie", "a=1"), ("Set-Cookie", "b=2")],
    )
    .await;
    let mut config = ForwardAuthConfig::new(authority.url("/"));
    config.headers.response_headers = vec!["X-User".into()];
    let checker = checker(config);

    let res = checker.check(&request(&[]), None).await.unwrap();

    assert!(!res.allow);
    assert_eq!(res.status_code, 403);
    assert_eq!(res.headers.get("x-reason").unwrap(), "expired");
    assert_eq!(res.headers.get_all("set-cookie").iter().count(), 2);
}

#[tokio::test]
async fn test_slow_authority_times_out() {
    let addr = common::start_silent_authority().await;
    let url = url::Url::parse(&format!("http://{}/", addr)).unwrap();
    let mut config = ForwardAuthConfig::new(url);
    config.timeout = Duration::from_millis(200);
    let checker = checker(config);

    let started = Instant::now();
    let err = checker.check(&request(&[]), None).await.unwrap_err();

    assert!(matches!(err, AuthzError::Upstream { .. }));
    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_caller_deadline_shortens_timeout() {
    let addr = common::start_silent_authority().await;
    let url = url::Url::parse(&format!("http://{}/", addr)).unwrap();
    let checker = checker(ForwardAuthConfig::new(url));

    let started = Instant::now();
    let err = checker
        .check(&request(&[]), Some(Duration::from_millis(200)))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthzError::Upstream { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_every_2xx_is_an_allow_with_status_200() {
    for status in [200, 201, 204, 299] {
        let authority = common::start_mock_authority(status, &[("X-User", "alice")]).await;
        let checker = checker(ForwardAuthConfig::new(authority.url("/")));

        let res = checker.check(&request(&[]), None).await.unwrap();

        assert!(res.allow, "{} should allow", status);
        assert_eq!(res.status_code, 200, "{} should report 200", status);
        assert_eq!(res.headers.get("x-user").unwrap(), "alice");
    }
}

#[tokio::test]
async fn test_deny_without_location_is_a_decision() {
    for status in [301, 302, 307, 400, 401, 403, 500] {
        let authority = common::start_mock_authority(status, &[("X-Reason", "nope")]).await;
        let checker = checker(ForwardAuthConfig::new(authority.url("/")));

        let res = checker.check(&request(&[]), None).await.unwrap();

        assert!(!res.allow, "{} should deny", status);
        assert_eq!(res.status_code, status);
        assert!(res.headers.get("location").is_none());
        assert_eq!(res.headers.get("x-reason").unwrap(), "nope");
    }
}

#[tokio::test]
async fn test_inbound_entity_headers_stay_off_the_bodiless_get() {
    let authority = common::start_mock_authority(200, &[]).await;
    let checker = checker(ForwardAuthConfig::new(authority.url("/oauth2/auth")));

    let mut inbound = request(&[
        ("content-length", "10"),
        ("content-type", "application/json"),
        ("host", "app.example.com"),
    ]);
    inbound.method = "POST".into();

    let res = checker.check(&inbound, None).await.unwrap();
    assert!(res.allow);

    let outbound = &authority.requests()[0];
    assert_eq!(outbound.method, "GET");
    assert!(outbound.header("content-length").is_none());
    assert_eq!(
        outbound.header_values("host"),
        vec![authority.addr.to_string()]
    );
    assert_eq!(outbound.header("x-forwarded-method").as_deref(), Some("POST"));
    assert_eq!(
        outbound.header("content-type").as_deref(),
        Some("application/json")
    );
}
