pub mod battle;
pub mod config;
pub mod dice;
pub mod error;
pub mod events;
pub mod export;
pub mod factory;
pub mod replay;
pub mod resolver;
pub mod stat_curve;
pub mod state;
