use std::collections::BTreeSet;

use crate::kafka_types::TopicPartition;

/// Consumer Group Member
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Member {
    /// Identifier
    pub id: String,

    /// Value of `client.id` set by the Consumer
    pub client_id: String,

    /// Host where the Consumer is running
    pub client_host: String,

    /// [`TopicPartition`]s the Group Coordinator assigned to this Member
    pub assignment: BTreeSet<TopicPartition>,
}

/// Description of a Consumer Group, as reported by the Group Coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupMembers {
    /// Group name
    pub name: String,

    /// Group state (e.g. `Stable`, `Empty`, `Dead`)
    pub state: String,

    /// Currently active [`Member`]s
    pub members: Vec<Member>,
}

impl GroupMembers {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Topics that at least one [`Member`] has been assigned partitions of.
    pub fn assigned_topics(&self) -> BTreeSet<String> {
        self.members
            .iter()
            .flat_map(|m| m.assignment.iter().map(|tp| tp.topic.clone()))
            .collect()
    }
}
