pub mod config;
pub mod dream;
pub mod lifespan;
pub mod timer;
