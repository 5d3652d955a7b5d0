pub mod events;
pub mod microphone;
pub mod turn_controller;
