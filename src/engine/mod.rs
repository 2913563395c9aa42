pub mod classifier;
pub mod controller;
pub mod loop_control;
pub mod retry;
pub mod rules;
pub mod state;
