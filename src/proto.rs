//! Generated protobuf types for the deprecated Envoy v2 external authorization API.
//!
//! Contour <= v1.10 still speaks v2, so the service registers both APIs. The v3
//! types come from `envoy-types`.

#![allow(missing_docs)]
#![allow(clippy::derive_partial_eq_without_eq)]

pub mod google {
    pub mod rpc {
        tonic::include_proto!("google.rpc");
    }
}

pub mod envoy {
    pub mod api {
        pub mod v2 {
            pub mod core {
                tonic::include_proto!("envoy.api.v2.core");
            }
        }
    }

    pub mod r#type {
        tonic::include_proto!("envoy.r#type");
    }

    pub mod service {
        pub mod auth {
            pub mod v2 {
                tonic::include_proto!("envoy.service.auth.v2");
            }
        }
    }
}
