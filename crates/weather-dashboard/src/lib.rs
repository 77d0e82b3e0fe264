pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod providers;
pub mod service;
pub mod shaper;
pub mod view;
