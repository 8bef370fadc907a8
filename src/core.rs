mod bonds;
mod cell;
mod collection;
mod error;
mod holder;
mod mesh;
mod neighbor;
mod property;

pub use {
    bonds::*,
    cell::*,
    collection::*,
    error::*,
    holder::*,
    mesh::*,
    neighbor::*,
    property::*,
};

// Aliases for vectors and points
pub type Vector3f = nalgebra::Vector3<f32>;
pub type Matrix3f = nalgebra::Matrix3<f32>;
pub type Pos = nalgebra::Point3<f32>; // Particle position
