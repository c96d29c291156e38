// Library for the CLI and tests to access modules

pub mod analysis;
pub mod config;
pub mod decoder;
pub mod error;
pub mod header;
pub mod layout;
pub mod models;
pub mod pipeline;
pub mod store;
