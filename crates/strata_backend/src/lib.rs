//! Netlist output for elaborated Strata designs.
//!
//! [`verilog::convert`] renders a design as one flattened Verilog module and
//! [`synth::run_tool`] hands that text to an external synthesis tool. Both
//! only read the design.

#![warn(missing_docs)]

pub mod code_writer;
pub mod error;
pub mod synth;
pub mod verilog;

pub use error::{BackendError, SynthError};
pub use synth::{run_tool, ToolConfig};
pub use verilog::convert;
