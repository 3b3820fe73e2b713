//! A bounding volume hierarchy with 16-bit quantized node bounds, stored in a flat array.

pub use self::build::PartitionStrategy;
pub use self::bvh::QuantizedBvh;
pub use self::node::{QuantizedNode, MAX_NODE_COUNT, QUANTIZED_MAX};
pub use self::quantization::{Quantizer, MIN_QUANTIZATION_EXTENT};
pub use self::traversal::RayHits;
pub use self::tree::QuantizedTree;
pub use self::validation::QuantizedBvhValidationError;
pub use self::volume::BvhVolume;

use self::build::read_volume;

mod build;
mod bvh;
mod node;
mod quantization;
mod traversal;
mod tree;
mod validation;
mod volume;
