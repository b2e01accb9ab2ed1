//! Protobuf bindings generated by `tonic-build` from `proto/`.

pub mod disperser {
    tonic::include_proto!("disperser");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("disperser_descriptor");
}

pub mod encoder {
    tonic::include_proto!("encoder");
}
