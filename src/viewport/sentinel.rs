use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SentinelId(pub u64);

/// Lifecycle of one sentinel element.
///
/// `Idle` -> `Observing` -> `Triggered` is the normal path. `Idle` is used
/// while observation is disabled, `Exhausted` once there is nothing left to
/// load. `Triggered` and `Exhausted` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SentinelState {
    Idle,
    Observing,
    Triggered,
    Exhausted,
}

pub struct SentinelTracker {
    states: BTreeMap<SentinelId, SentinelState>,
    next_id: u64,
    enabled: bool,
    exhausted: bool,
}

impl SentinelTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            states: BTreeMap::new(),
            next_id: 0,
            enabled,
            exhausted: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn state(&self, id: SentinelId) -> Option<SentinelState> {
        self.states.get(&id).copied()
    }

    /// Registers a newly attached sentinel and returns its id.
    pub fn register(&mut self) -> SentinelId {
        self.next_id += 1;
        let id = SentinelId(self.next_id);
        let state = if self.exhausted {
            SentinelState::Exhausted
        } else if self.enabled {
            SentinelState::Observing
        } else {
            SentinelState::Idle
        };
        self.states.insert(id, state);
        id
    }

    /// Returns true exactly once per observed sentinel: the caller must load
    /// the next page and stop observing `id`.
    pub fn on_intersection(&mut self, id: SentinelId, is_intersecting: bool) -> bool {
        if !is_intersecting || !self.enabled {
            return false;
        }
        match self.states.get_mut(&id) {
            Some(state) if *state == SentinelState::Observing => {
                *state = SentinelState::Triggered;
                true
            }
            _ => false,
        }
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.transition(SentinelState::Observing, SentinelState::Idle);
    }

    /// Returns the sentinels that must be observed again.
    pub fn enable(&mut self) -> Vec<SentinelId> {
        self.enabled = true;
        self.transition(SentinelState::Idle, SentinelState::Observing)
    }

    /// Marks every pending sentinel exhausted and returns the ones that were
    /// being observed.
    pub fn exhaust(&mut self) -> Vec<SentinelId> {
        if self.exhausted {
            return Vec::new();
        }
        self.exhausted = true;
        self.transition(SentinelState::Idle, SentinelState::Exhausted);
        self.transition(SentinelState::Observing, SentinelState::Exhausted)
    }

    /// Leaves the exhausted state after the list was reset upstream. Exhausted
    /// sentinels are forgotten; new ones are observed again.
    pub fn revive(&mut self) {
        self.exhausted = false;
        self.states.retain(|_, s| *s != SentinelState::Exhausted);
    }

    pub fn observing(&self) -> Vec<SentinelId> {
        self.states
            .iter()
            .filter(|(_, s)| **s == SentinelState::Observing)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Forgets every sentinel, keeping the enabled flag.
    pub fn reset(&mut self) {
        self.states.clear();
        self.exhausted = false;
    }

    fn transition(&mut self, from: SentinelState, to: SentinelState) -> Vec<SentinelId> {
        let mut moved = Vec::new();
        for (id, state) in self.states.iter_mut() {
            if *state == from {
                *state = to;
                moved.push(*id);
            }
        }
        moved
    }
}
