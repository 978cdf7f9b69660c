//! `envoy.service.auth.v2.Authorization`, kept for proxies that predate v3.

use std::sync::Arc;

use tracing::debug;

use crate::authz::{AuthzError, AuthzResult, Checker, HttpAttributes, Request, Response};
use crate::grpc::{deadline, header_options, run_check};
use crate::proto::envoy::api::v2::core::{HeaderValue, HeaderValueOption};
use crate::proto::envoy::r#type::HttpStatus;
use crate::proto::envoy::service::auth::v2::authorization_server::{
    Authorization, AuthorizationServer,
};
use crate::proto::envoy::service::auth::v2::check_response::HttpResponse;
use crate::proto::envoy::service::auth::v2::{
    CheckRequest, CheckResponse, DeniedHttpResponse, OkHttpResponse,
};
use crate::proto::google::rpc::Status as RpcStatus;

/// Label used in logs and metrics.
pub const API_VERSION: &str = "v2";

/// Decode a v2 check request into a neutral [`Request`].
pub fn decode(request: &CheckRequest) -> AuthzResult<Request> {
    let http = request
        .attributes
        .as_ref()
        .and_then(|attrs| attrs.request.as_ref())
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
        tls: false,
    }))
}

/// Encode a neutral [`Response`] as a v2 check response.
pub fn encode(response: &Response) -> CheckResponse {
    let headers = header_options(&response.headers, |key, value, append| HeaderValueOption {
        header: Some(HeaderValue { key, value }),
        append: Some(append),
    });

    if response.allow {
        return CheckResponse {
            status: Some(RpcStatus {
                code: tonic::Code::Ok as i32,
                ..Default::default()
            }),
            http_response: Some(HttpResponse::OkResponse(OkHttpResponse { headers })),
        };
    }

    CheckResponse {
        status: Some(RpcStatus {
            code: tonic::Code::PermissionDenied as i32,
            ..Default::default()
        }),
        http_response: Some(HttpResponse::DeniedResponse(DeniedHttpResponse {
            status: Some(HttpStatus {
                code: i32::from(response.status_code),
            }),
            headers,
            body: String::new(),
        })),
    }
}

/// v2 authorization service.
#[derive(Clone)]
pub struct AuthorizationV2 {
    checker: Arc<dyn Checker>,
}

impl AuthorizationV2 {
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
impl Authorization for AuthorizationV2 {
    async fn check(
        &self,
        request: tonic::Request<CheckRequest>,
    ) -> Result<tonic::Response<CheckResponse>, tonic::Status> {
        let deadline = deadline::grpc_timeout(request.metadata());
        let request = request.into_inner();
        debug!(request = ?request, "Handling v2 request");

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
