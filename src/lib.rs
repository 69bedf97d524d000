pub mod app;
pub mod audio;
pub mod backend;
pub mod config;
pub mod core;
pub mod downloader;
pub mod error;
pub mod history;
pub mod library;
pub mod model;
pub mod protocol;
pub mod shuffle;
pub mod ui;
