// src/models/mod.rs

pub mod assignment;
pub mod attempt;
pub mod blog;
pub mod employee;
pub mod question;
