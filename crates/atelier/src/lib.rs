pub mod agent;
pub mod checkpoint;
pub mod coordinator;
pub mod errors;
pub mod models;
pub mod notify;
pub mod providers;
pub mod session;
pub mod team;
pub mod tools;
pub mod transcript;
