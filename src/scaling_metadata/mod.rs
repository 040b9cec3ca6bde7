// Inner modules
mod errors;
mod metadata;
mod partition_limitation;

// Exports
pub use errors::{ScalingMetadataError, ScalingMetadataResult};
pub use metadata::{OffsetResetPolicy, ScalingMetadata, ScalingMetadataBuilder};
pub use partition_limitation::parse_partition_limitation;
