//! `envoy.service.auth.v3.Authorization`.

use std::sync::Arc;

use envoy_types::ext_authz::v3::CheckResponseExt;
use envoy_types::pb::envoy::config::core::v3::header_value_option::HeaderAppendAction;
use envoy_types::pb::envoy::config::core::v3::{HeaderValue, HeaderValueOption};
use envoy_types::pb::envoy::r#type::v3::HttpStatus;
use envoy_types::pb::envoy::service::auth::v3::authorization_server::{
    Authorization, AuthorizationServer,
};
use envoy_types::pb::envoy::service::auth::v3::check_response::HttpResponse;
use envoy_types::pb::envoy::service::auth::v3::{
    CheckRequest, CheckResponse, DeniedHttpResponse, OkHttpResponse,
};
use tracing::debug;

use crate::authz::{AuthzError, AuthzResult, Checker, HttpAttributes, Request, Response};
use crate::grpc::{deadline, header_options, run_check};

/// Label used in logs and metrics.
pub const API_VERSION: &str = "v3";

/// Decode a v3 check request into a neutral [`Request`].
pub fn decode(request: &CheckRequest) -> AuthzResult<Request> {
    let attrs = request
        .attributes
        .as_ref()
        .ok_or_else(|| AuthzError::conversion("check request has no attributes"))?;
    let http = attrs
        .request
        .as_ref()
        .and_then(|req| req.http.as_ref())
        .ok_or_else(|| AuthzError::conversion("check request has no HTTP attributes"))?;

    Ok(Request::from_attributes(HttpAttributes {
        id: &http.id,
        method: &http.method,
        headers: &http.headers,
        path: &http.path,
        query: &http.query,
        host: &http.host,
        scheme: &http.scheme,
        tls: attrs.tls_session.is_some(),
    }))
}

/// Encode a neutral [`Response`] as a v3 check response.
pub fn encode(response: &Response) -> CheckResponse {
    let headers = header_options(&response.headers, |key, value, append| {
        let action = if append {
            HeaderAppendAction::AppendIfExistsOrAdd
        } else {
            HeaderAppendAction::OverwriteIfExistsOrAdd
        };
        HeaderValueOption {
            header: Some(HeaderValue {
                key,
                value,
                ..Default::default()
            }),
            append_action: action as i32,
            ..Default::default()
        }
    });

    if response.allow {
        let mut res = CheckResponse::with_status(tonic::Status::ok(""));
        res.http_response = Some(HttpResponse::OkResponse(OkHttpResponse {
            headers,
            ..Default::default()
        }));
        return res;
    }

    let mut res = CheckResponse::with_status(tonic::Status::permission_denied(""));
    res.http_response = Some(HttpResponse::DeniedResponse(DeniedHttpResponse {
        status: Some(HttpStatus {
            code: i32::from(response.status_code),
        }),
        headers,
        body: String::new(),
    }));
    res
}

/// v3 authorization service.
#[derive(Clone)]
pub struct AuthorizationV3 {
    checker: Arc<dyn Checker>,
}

impl AuthorizationV3 {
    /// Create the service around a shared checker.
    pub fn new(checker: Arc<dyn Checker>) -> Self {
        Self { checker }
    }

    /// Wrap in the generated tonic server.
    pub fn into_server(self) -> AuthorizationServer<Self> {
        AuthorizationServer::new(self)
    }
}

#[tonic::async_trait]
impl Authorization for AuthorizationV3 {
    async fn check(
        &self,
        request: tonic::Request<CheckRequest>,
    ) -> Result<tonic::Response<CheckResponse>, tonic::Status> {
        let deadline = deadline::grpc_timeout(request.metadata());
        let request = request.into_inner();
        debug!(request = ?request, "Handling v3 request");

        let response = run_check(
            self.checker.as_ref(),
            API_VERSION,
            decode(&request),
            deadline,
        )
        .await?;

        Ok(tonic::Response::new(encode(&response)))
    }
}
