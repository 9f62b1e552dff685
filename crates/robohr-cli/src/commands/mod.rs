//! Subcommands of the `robohr` binary.

pub mod ask;
pub mod capabilities;
pub mod check;
pub mod serve;
