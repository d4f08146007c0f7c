pub mod generate_key;
pub mod start;
pub mod status;
