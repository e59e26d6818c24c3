//! District membership: a first-class index from district name to the set
//! of live sessions inside it, plus the reverse lookup. Every session is in
//! at most one district; the two maps move together. Transfer orchestration
//! (events, spawn points, plot snapshots) lives with the event worker; this
//! module owns the bookkeeping it relies on.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::world::geometry::{district_geometry, interior_plot_id};
use crate::world::types::SessionId;

pub struct DistrictManager {
    members: HashMap<String, HashSet<SessionId>>,
    locations: HashMap<SessionId, String>,
    /// Plot ids that may be entered as `house_<id>` interiors.
    valid_plots: HashSet<String>,
}

impl DistrictManager {
    pub fn new<I, S>(plot_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: HashMap::new(),
            locations: HashMap::new(),
            valid_plots: plot_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// A target is joinable when it is a fixed district or the interior of a
    /// known plot. Anything else is silently rejected by the caller.
    pub fn is_valid_target(&self, target: &str) -> bool {
        if district_geometry(target).is_some() {
            return true;
        }
        match interior_plot_id(target) {
            Some(plot_id) => self.valid_plots.contains(plot_id),
            None => false,
        }
    }

    /// Places a session into `district`, removing it from its previous one
    /// first. Returns the previous district when the session was joined.
    pub fn move_session(&mut self, session: SessionId, district: &str) -> Option<String> {
        let previous = self.remove(session);
        self.members
            .entry(district.to_string())
            .or_default()
            .insert(session);
        self.locations.insert(session, district.to_string());
        debug!(
            "Session {session} joined district {district} (from {})",
            previous.as_deref().unwrap_or("unjoined")
        );
        previous
    }

    /// Removes a session from the index entirely. Returns the district it
    /// was in, if any. Empty member sets are dropped so lazily-created
    /// interiors do not accumulate.
    pub fn remove(&mut self, session: SessionId) -> Option<String> {
        let district = self.locations.remove(&session)?;
        if let Some(set) = self.members.get_mut(&district) {
            set.remove(&session);
            if set.is_empty() {
                self.members.remove(&district);
            }
        }
        Some(district)
    }

    pub fn location_of(&self, session: SessionId) -> Option<&str> {
        self.locations.get(&session).map(String::as_str)
    }

    pub fn is_member(&self, district: &str, session: SessionId) -> bool {
        self.members
            .get(district)
            .is_some_and(|set| set.contains(&session))
    }

    /// Members of a district in stable (ascending id) order, so broadcast
    /// and peer-list ordering is deterministic.
    pub fn members_of(&self, district: &str) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .members
            .get(district)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    pub fn occupancy(&self, district: &str) -> usize {
        self.members.get(district).map_or(0, HashSet::len)
    }

    /// Number of districts that currently have at least one member.
    pub fn active_districts(&self) -> usize {
        self.members.len()
    }
}
