#![warn(unused_extern_crates)]
//! Fast orthtree container type: an n-dimensional generalization of
//! quadtrees and octrees for storing points and axis-aligned regions and
//! querying them by location.

pub use glam;

mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod geometry;
pub use geometry::{ Point, Region, Shape, MAX_DIMENSIONS };

mod orthtree;
pub use orthtree::{ ItemHandle, ItemRef, Neighbor, OrthtreeIndex, OrthtreeStats, Query };

pub(crate) mod utils;
