pub mod database;
pub mod entities;
pub mod openai;
pub mod repositories;
pub mod traits;
