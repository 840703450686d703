#[path = "../common/mod.rs"]
mod common;

mod engine_tests;
mod pipeline_tests;
