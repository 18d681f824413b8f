//! # UI Module
//!
//! Views and canvas widgets for the trainer window.

pub mod cent_meter;
pub mod chord_diagram;
pub mod main_display;
