pub mod configuration;
pub mod container_management;
pub mod controller;
pub mod error_handling;
pub mod network;
pub mod reporting;
pub mod session_management;
pub mod storage;
