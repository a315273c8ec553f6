pub mod config;
pub mod connection;
pub mod error;
pub mod pacer;
pub mod protocol;
pub mod results;
pub mod runner;
pub mod session;
pub mod shutdown;
pub mod stats;
pub mod stub;
pub mod tasks;
