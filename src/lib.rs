// src/lib.rs

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;
pub mod response;
pub mod routes;
pub mod seed;
pub mod state;
pub mod storage;
pub mod utils;

pub use routes::create_router;
