pub mod account;
pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod cli;
pub mod config;
pub mod error;
pub mod money;
pub mod seed;
pub mod storage;
