//! Rasterizer for SVG mesh gradients.
//!
//! Main features:
//!  - `<meshgradient>` description tree with Coons and tensor patches
//!  - Adaptive Bezier subdivision rasterization into an RGBA buffer
//!  - SVG transform-list and stop edge-path parsing
//!
#![deny(warnings)]

mod color;
mod geometry;
mod image;
mod mesh;
mod raster;
mod svg;
mod utils;

pub use color::{Color, ColorError, Rgba};
pub use geometry::{scalar_fmt, BBox, Point, Scalar, Transform, EPSILON, PI};
pub use image::{Image, ImageMut, ImageOwned, ImageWrite, Shape};
pub use mesh::{Mesh, MeshError, MeshGradient, MeshPatch, MeshRow, MeshStop, Units};
pub use svg::{parse_transform_list, EdgePath, SvgParserError, TransformListParser};
use utils::clamp;
