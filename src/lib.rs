pub mod client_info;
pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod notifier;
pub mod routes;
pub mod startup;
pub mod storage;
pub mod telemetry;
pub mod utils;
