use std::{env, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    if env::var_os("PROTOC").is_none() {
        env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .file_descriptor_set_path(out_dir.join("disperser_descriptor.bin"))
        .compile_protos(&["proto/disperser.proto"], &["proto"])?;

    tonic_build::configure()
        .build_client(true)
        .build_server(false)
        .compile_protos(&["proto/encoder.proto"], &["proto"])?;

    Ok(())
}
