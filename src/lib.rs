pub mod account;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod error;
pub mod framework;
pub mod operation;
pub mod provisioning;
pub mod state;
pub mod submission;
pub mod workflow;
pub mod workflows;
