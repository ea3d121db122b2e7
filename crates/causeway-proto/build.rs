use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use protoc-bin-vendored to avoid needing protoc installed
    let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| e.to_string())?;
    std::env::set_var("PROTOC", protoc);
    let well_known = protoc_bin_vendored::include_path().map_err(|e| e.to_string())?;

    let proto_dir = PathBuf::from("../../proto");
    let protos = [
        proto_dir.join("causeway/errors/v1/chain.proto"),
        proto_dir.join("google/rpc/status.proto"),
        proto_dir.join("google/rpc/error_details.proto"),
    ];

    let mut config = prost_build::Config::new();
    config.enable_type_names();
    config.type_name_domain(["."], "type.googleapis.com");

    // Only the chain types get serde; google.rpc.Status holds prost_types::Any,
    // which has no serde impls.
    config.type_attribute(
        ".causeway.errors.v1",
        "#[derive(serde::Serialize, serde::Deserialize)]",
    );
    config.type_attribute(".causeway.errors.v1", "#[serde(rename_all = \"snake_case\")]");
    config.field_attribute(
        ".causeway.errors.v1.ErrorChainNode.data",
        "#[serde(default)]",
    );

    config.compile_protos(&protos, &[proto_dir.as_path(), well_known.as_path()])?;

    for proto in &protos {
        println!("cargo:rerun-if-changed={}", proto.display());
    }
    println!("cargo:rerun-if-changed=build.rs");

    Ok(())
}
