pub mod config;
pub mod document;
pub mod query;
pub mod server;
pub mod workspace;

pub use server::SkiffLanguageServer;
