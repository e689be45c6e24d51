pub mod aggregator;
pub mod blockchain_manager;
pub mod config;
pub mod dashboard;
pub mod dispatcher;
pub mod health_server;
pub mod protocol;
pub mod terminal;
pub mod utils;
pub mod view;
pub mod wallet;

#[cfg(test)]
mod test_support;
