fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "grpc")]
    {
        // Use bundled protoc from protobuf-src.
        // SAFETY: build scripts run single-threaded.
        unsafe { std::env::set_var("PROTOC", protobuf_src::protoc()) };

        tonic_build::configure()
            .build_server(false)
            .build_client(true)
            .compile_protos(&["proto/generativesampler.proto"], &["proto"])?;
    }
    Ok(())
}
