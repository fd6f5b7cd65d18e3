#![no_std]

// Shared logic for the glow plug controller.
//
// Everything here stays free of the Rust standard library so the same
// scheduling, protection, and sensor code runs on the MCU firmware and inside
// the host emulator. Hardware access is reached only through the narrow
// collaborator traits exported by the individual modules.
pub mod board;
pub mod config;
pub mod indicator;
pub mod protection;
pub mod scheduler;
pub mod sensor;
pub mod supervisor;
pub mod telemetry;
pub mod time;
