pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod game;
pub mod interest;
pub mod lerp;
pub mod model;
pub mod net;
pub mod physics;
pub mod server;
pub mod world;
