//! monitorz: terminal dashboard for a local machine-metrics agent.

pub mod app;
pub mod dashboard;
pub mod detail;
pub mod error;
pub mod history;
pub mod http;
pub mod logging;
pub mod poller;
pub mod profiles;
pub mod types;
pub mod ui;
