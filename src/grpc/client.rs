//! Minimal authorization client for both API versions.
//!
//! Used by `forwardeaz-cli` and the end-to-end tests. Calls go through
//! [`tonic::client::Grpc`] directly, so the v2 protos only need server
//! stubs and the v3 client does not depend on `envoy-types` codegen options.

use std::collections::HashMap;
use std::time::Duration;

use http::uri::{InvalidUri, PathAndQuery};
use http::Uri;
use serde::Serialize;
use thiserror::Error;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};

use crate::proto::envoy::service::auth::v2 as pb2;
use envoy_types::pb::envoy::config::core::v3::header_value_option::HeaderAppendAction;
use envoy_types::pb::envoy::service::auth::v3 as pb3;

const V2_CHECK: &str = "/envoy.service.auth.v2.Authorization/Check";
const V3_CHECK: &str = "/envoy.service.auth.v3.Authorization/Check";

/// Client-side errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server address: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("check failed: {0}")]
    Status(#[from] tonic::Status),
}

/// Authorization API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V2,
    V3,
}

/// HTTP attributes to send in a check request.
#[derive(Debug, Clone, Default)]
pub struct CheckAttributes {
    pub method: String,
    pub host: String,
    pub path: String,
    pub scheme: String,
    pub headers: HashMap<String, String>,
}

impl CheckAttributes {
    /// The attributes as a v2 check request.
    pub fn to_v2(&self) -> pb2::CheckRequest {
        pb2::CheckRequest {
            attributes: Some(pb2::AttributeContext {
                request: Some(pb2::attribute_context::Request {
                    http: Some(pb2::attribute_context::HttpRequest {
                        method: self.method.clone(),
                        host: self.host.clone(),
                        path: self.path.clone(),
                        scheme: self.scheme.clone(),
                        headers: self.headers.clone(),
                        ..Default::default()
                    }),
                }),
                ..Default::default()
            }),
        }
    }

    /// The attributes as a v3 check request.
    pub fn to_v3(&self) -> pb3::CheckRequest {
        pb3::CheckRequest {
            attributes: Some(pb3::AttributeContext {
                request: Some(pb3::attribute_context::Request {
                    http: Some(pb3::attribute_context::HttpRequest {
                        method: self.method.clone(),
                        host: self.host.clone(),
                        path: self.path.clone(),
                        scheme: self.scheme.clone(),
                        headers: self.headers.clone(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }
    }
}

/// A header option from a check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
    pub append: bool,
}

/// Version-independent summary of a check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub api_version: ApiVersion,
    /// `google.rpc.Status` code
    pub code: i32,
    pub allowed: bool,
    /// HTTP status of a denied response
    pub http_status: Option<i32>,
    pub headers: Vec<HeaderEntry>,
}

impl From<pb2::CheckResponse> for CheckOutcome {
    fn from(res: pb2::CheckResponse) -> Self {
        use pb2::check_response::HttpResponse;

        let (allowed, http_status, options) = match res.http_response {
            Some(HttpResponse::OkResponse(ok)) => (true, None, ok.headers),
            Some(HttpResponse::DeniedResponse(denied)) => {
                (false, denied.status.map(|s| s.code), denied.headers)
            }
            None => (false, None, Vec::new()),
        };

        Self {
            api_version: ApiVersion::V2,
            code: res.status.map(|s| s.code).unwrap_or_default(),
            allowed,
            http_status,
            headers: options
                .into_iter()
                .filter_map(|opt| {
                    let header = opt.header?;
                    Some(HeaderEntry {
                        key: header.key,
                        value: header.value,
                        append: opt.append.unwrap_or(false),
                    })
                })
                .collect(),
        }
    }
}

impl From<pb3::CheckResponse> for CheckOutcome {
    fn from(res: pb3::CheckResponse) -> Self {
        use pb3::check_response::HttpResponse;

        let (allowed, http_status, options) = match res.http_response {
            Some(HttpResponse::OkResponse(ok)) => (true, None, ok.headers),
            Some(HttpResponse::DeniedResponse(denied)) => {
                (false, denied.status.map(|s| s.code), denied.headers)
            }
            _ => (false, None, Vec::new()),
        };

        Self {
            api_version: ApiVersion::V3,
            code: res.status.map(|s| s.code).unwrap_or_default(),
            allowed,
            http_status,
            headers: options
                .into_iter()
                .filter_map(|opt| {
                    let append =
                        opt.append_action == HeaderAppendAction::AppendIfExistsOrAdd as i32;
                    let header = opt.header?;
                    Some(HeaderEntry {
                        key: header.key,
                        value: header.value,
                        append,
                    })
                })
                .collect(),
        }
    }
}

/// gRPC client speaking either authorization API version.
#[derive(Debug, Clone)]
pub struct CheckClient {
    grpc: Grpc<Channel>,
}

impl CheckClient {
    /// Connect to `address`, e.g. `http://127.0.0.1:9090`.
    pub async fn connect(address: &str) -> Result<Self, ClientError> {
        let uri: Uri = address.parse()?;
        let channel = Endpoint::from(uri).connect().await?;
        Ok(Self {
            grpc: Grpc::new(channel),
        })
    }

    /// Call the v2 `Check` RPC.
    pub async fn check_v2(
        &mut self,
        request: pb2::CheckRequest,
        timeout: Option<Duration>,
    ) -> Result<pb2::CheckResponse, tonic::Status> {
        self.unary(V2_CHECK, request, timeout).await
    }

    /// Call the v3 `Check` RPC.
    pub async fn check_v3(
        &mut self,
        request: pb3::CheckRequest,
        timeout: Option<Duration>,
    ) -> Result<pb3::CheckResponse, tonic::Status> {
        self.unary(V3_CHECK, request, timeout).await
    }

    /// Send `attributes` with the given API version and summarize the answer.
    pub async fn check(
        &mut self,
        api: ApiVersion,
        attributes: &CheckAttributes,
        timeout: Option<Duration>,
    ) -> Result<CheckOutcome, ClientError> {
        let outcome = match api {
            ApiVersion::V2 => self.check_v2(attributes.to_v2(), timeout).await?.into(),
            ApiVersion::V3 => self.check_v3(attributes.to_v3(), timeout).await?.into(),
        };
        Ok(outcome)
    }

    async fn unary<Req, Res>(
        &mut self,
        path: &'static str,
        request: Req,
        timeout: Option<Duration>,
    ) -> Result<Res, tonic::Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Res: prost::Message + Default + Send + Sync + 'static,
    {
        self.grpc
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("Service was not ready: {}", e)))?;

        let mut request = tonic::Request::new(request);
        if let Some(timeout) = timeout {
            request.set_timeout(timeout);
        }

        let codec = ProstCodec::<Req, Res>::default();
        let response = self
            .grpc
            .unary(request, PathAndQuery::from_static(path), codec)
            .await?;
        Ok(response.into_inner())
    }
}
