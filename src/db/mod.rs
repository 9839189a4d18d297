#[cfg(test)]
pub mod memory;
pub mod migrations;
pub mod repository;
pub mod store;
