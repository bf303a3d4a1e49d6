//! RISC-V Instruction Sequence Generator
//!
//! This library generates randomized RV32IMC assembly sequences and wraps
//! them into C measurement harnesses for side-channel trace collection.

pub mod config;
pub mod consts;
pub mod error;
pub mod harness;
pub mod random_asm;
pub mod utils;
