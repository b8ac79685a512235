use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    /// First unmet request for its base key; its alignment gets computed.
    Generate,
    /// Another job already covers or has claimed the base key.
    Wait,
}

/// Accumulator threaded through one batch: base keys already satisfied by
/// an existing alignment, and base keys claimed for generation.
#[derive(Debug, Clone, Default)]
pub struct TriageState {
    satisfied: HashSet<String>,
    claimed: HashSet<String>,
}

impl TriageState {
    pub fn mark_satisfied(&mut self, base_key: &str) {
        self.satisfied.insert(base_key.to_string());
    }

    pub fn is_covered(&self, base_key: &str) -> bool {
        self.satisfied.contains(base_key) || self.claimed.contains(base_key)
    }

    pub fn classify(&mut self, base_key: &str) -> Queue {
        if self.is_covered(base_key) {
            Queue::Wait
        } else {
            self.claimed.insert(base_key.to_string());
            Queue::Generate
        }
    }
}

/// Jobs per queue, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriageQueues {
    pub generate: Vec<String>,
    pub wait: Vec<String>,
}

impl TriageQueues {
    pub fn push(&mut self, queue: Queue, job: &str) {
        match queue {
            Queue::Generate => self.generate.push(job.to_string()),
            Queue::Wait => self.wait.push(job.to_string()),
        }
    }
}
