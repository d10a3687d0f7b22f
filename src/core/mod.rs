pub mod assistant;
pub mod persistence;
pub mod services;
pub mod traits;
