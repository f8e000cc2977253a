pub mod album;
pub mod catalog;
pub mod dispatcher;
pub mod runner;
pub mod session;
pub mod store;
pub mod transform;
pub mod workers_ai;
