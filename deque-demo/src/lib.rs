#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]

pub mod cli;
pub mod runner;
pub mod types;
