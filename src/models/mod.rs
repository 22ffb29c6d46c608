// src/models/mod.rs

pub mod evaluation;
pub mod proctor;
pub mod round;
