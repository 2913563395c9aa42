pub mod command;
pub mod gateway;
pub mod input;
