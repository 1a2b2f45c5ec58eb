//! Rendering subsystem.

pub mod ui;
