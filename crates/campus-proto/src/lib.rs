//! Generated gRPC types for the campus service.
//!
//! The wire contract lives in `proto/campus.proto`; this crate only
//! re-exports what `tonic-build` generates from it.

tonic::include_proto!("campus");
