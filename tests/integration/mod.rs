//! Integration tests for the transform pipeline.

mod merge_properties;
mod transform_flow;
