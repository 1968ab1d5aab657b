//! Content reconciliation and site assembly for sitepipe.
//!
//! Raw entries flow through the [`normalize`], [`validate`], [`sequence`] and
//! [`index`] stages, and [`assembler`] writes the result. [`pipeline`] wires
//! the stages to a content source (e.g., [`pipeline::build_site`]).

pub mod assembler;
pub mod index;
pub mod normalize;
pub mod pipeline;
pub mod sequence;
pub mod validate;

#[cfg(test)]
mod fixtures;
