//! Particle backdrop: simulation, neighbour search and drawing surfaces.

pub mod field;
pub mod grid;
pub mod surface;

pub use field::{Connection, Particle, ParticleField};
pub use surface::{DrawCommand, DrawList, Paint, Surface};
