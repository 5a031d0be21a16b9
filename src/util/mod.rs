pub mod message;
pub mod parser;
pub mod time;
