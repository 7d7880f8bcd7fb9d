pub mod history;
pub mod proxy;
pub mod server;
pub mod telemetry;
pub mod version;
pub mod web;
