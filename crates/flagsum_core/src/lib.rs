pub mod config;
pub mod flags;
pub mod publish;
pub mod table;
