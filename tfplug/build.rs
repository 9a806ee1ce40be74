fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/tfplugin6.9.proto");

    tonic_build::configure()
        .build_client(false)
        .build_server(true)
        .compile_protos(&["proto/tfplugin6.9.proto"], &["proto"])?;

    Ok(())
}
