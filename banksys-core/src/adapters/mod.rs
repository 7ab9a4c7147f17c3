//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client for the BankingApi port
//! - In-process demo backend for BankingApi (no server needed)
//! - JSON file on disk for the KeyValueStore port
//! - In-memory map for KeyValueStore (ephemeral sessions, tests)

pub mod demo;
pub mod file_store;
pub mod http;
pub mod memory_store;
