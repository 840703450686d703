pub mod api;
pub mod args;
pub mod catalog;
pub mod database;
pub mod error;
pub mod messaging;
pub mod model;
pub mod pipeline;
pub mod utils;
