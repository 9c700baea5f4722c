#![doc = include_str!("../README.md")]

pub mod map_align;
pub mod rt_transform;

/// A subset of the types and traits expected to be used the most; importing
/// this is a good starting point for working with the crate.
pub mod prelude {
    pub use crate::map_align::{align_by_identification, align_pose_clustering, apply_to_map, PoseClusteringParams};
    pub use crate::rt_transform::{
        AnchorPair, ExtrapolationPolicy, LowessInterpolation, OutlierRemoval, RTTransformation, TransformKind,
    };
}
