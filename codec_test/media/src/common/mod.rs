//! Constants shared across media modules

pub mod constants;
