// src/handlers/mod.rs

pub mod attempt;
pub mod evaluation;
pub mod proctor;
pub mod rounds;
