pub mod availability;
pub mod bulk_upload;
pub mod configuration;
pub mod configuration_handler;
pub mod error;
pub mod filters;
pub mod http;
pub mod ledger;
pub mod portal_data;
pub mod portal_source;
pub mod reconciliation;
pub mod rest_tables;
pub mod session;
pub mod static_data;
#[cfg(test)]
mod testutils;
pub mod types;
