//! Spatial partitioning tools.

pub use self::quantized_bvh::{
    BvhVolume, PartitionStrategy, QuantizedBvh, QuantizedBvhValidationError, QuantizedNode,
    QuantizedTree, Quantizer, RayHits, MAX_NODE_COUNT, MIN_QUANTIZATION_EXTENT, QUANTIZED_MAX,
};

pub mod quantized_bvh;
