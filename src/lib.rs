pub mod catalog;
pub mod claim;
pub mod cli;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod error;
pub mod quest;
pub mod signer;
pub mod tx_builder;
pub mod wallet;
