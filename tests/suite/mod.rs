//! Integration test suite modules

mod choice;
mod config;
mod session;
