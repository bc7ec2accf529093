// Library for tests to access modules

pub mod aggregation;
pub mod config;
pub mod countdown;
pub mod models;
pub mod poller;
pub mod routes;
pub mod session;
pub mod source;
pub mod version;
