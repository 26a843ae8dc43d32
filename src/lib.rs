pub mod configuration;
pub mod controller;
pub mod error_handling;
pub mod network;
pub mod reporting;
pub mod storage;
pub mod web_interface;
