pub mod app;
pub mod config;
pub mod export;
pub mod geo;
pub mod highlight;
pub mod io;
pub mod tree;
pub mod ui;
