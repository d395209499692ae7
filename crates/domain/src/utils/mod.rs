//! Domain utility helpers

pub mod epoch;
