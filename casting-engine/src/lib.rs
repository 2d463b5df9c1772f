pub mod casting;
pub mod config;
pub mod display;
pub mod error;
pub mod parser;
pub mod web;
