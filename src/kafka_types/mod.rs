mod group;
mod offset;
mod topic_partition;

pub use group::{GroupMembers, Member};
pub use offset::{Offset, OffsetBounds, OffsetMap, TopicPartitionSet};
pub use topic_partition::TopicPartition;
