pub mod chat;
pub mod command;
pub mod config;
pub mod error;
pub mod game;
pub mod night;
pub mod notice;
pub mod player;
pub mod role;
pub mod trial;
