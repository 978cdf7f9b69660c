fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The v3 API ships with envoy-types; only the deprecated v2 API is compiled here.
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(
            &[
                "proto/google/rpc/status.proto",
                "proto/envoy/type/http_status.proto",
                "proto/envoy/api/v2/core/base.proto",
                "proto/envoy/service/auth/v2/attribute_context.proto",
                "proto/envoy/service/auth/v2/external_auth.proto",
            ],
            &["proto"],
        )?;

    // Re-run if proto files change
    println!("cargo:rerun-if-changed=proto");

    Ok(())
}
