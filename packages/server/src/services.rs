pub mod command_service;
pub mod game_service;
pub mod gateway;
pub mod judge;
pub mod phase_service;
pub mod roster_service;
