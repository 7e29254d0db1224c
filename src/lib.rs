//! A CHIP-8 interpreter core.
//!
//! [`cpu::Cpu`] owns the whole machine and executes one instruction per
//! [`cpu::Cpu::cycle`]. Pacing, timers, input and presentation belong to the
//! host; [`runner`] and [`helper`] provide the pieces `main.rs` uses.

pub mod config;
pub mod cpu;
pub mod error;
pub mod helper;
pub mod keyboard;
pub mod opcode;
pub mod rom;
pub mod runner;

pub use cpu::{Cpu, Cycle};
pub use error::Error;
pub use opcode::Instruction;
