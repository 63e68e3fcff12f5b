pub mod cli;
pub mod commands;
pub mod compact;
pub mod config;
pub mod dom;
pub mod export;
pub mod mobile;
pub mod nav;
pub mod parser;
pub mod render;

#[cfg(feature = "wasm")]
pub mod web;
