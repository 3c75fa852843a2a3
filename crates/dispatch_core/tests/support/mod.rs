#![allow(dead_code)]

pub mod invariants;
pub mod schedule;
pub mod world;
