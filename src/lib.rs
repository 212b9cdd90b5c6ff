// lib.rs
pub mod commands;
pub mod error;
pub mod interval;
pub mod natsort;
pub mod regions;
pub mod tools;
