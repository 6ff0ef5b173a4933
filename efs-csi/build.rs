use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let proto_dir = manifest_dir.join("proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .file_descriptor_set_path(out_dir.join("csi_descriptor.bin"))
        .compile_protos(&[proto_dir.join("csi.proto")], &[proto_dir])?;

    println!("cargo:rerun-if-changed=proto/csi.proto");
    Ok(())
}
