pub mod accounts;
pub mod blockchain;
pub mod config;
pub mod faucet;
pub mod service;

#[cfg(test)]
mod testing;
