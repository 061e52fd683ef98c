//! Participant roster reconciliation
//!
//! `reconcile` merges the engine's participant listing into the previous
//! roster. It is pure: no I/O, no clock, same input gives same output.
//!
//! Output guarantees:
//! - exactly one entry with `is_local = true`
//! - no duplicate ids
//! - entries present before and after keep their relative order; new
//!   remote entries are appended in reported order, a new local entry goes
//!   first

use crate::engine::ReportedParticipant;
use crate::types::{Participant, ParticipantRole};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Id used for the local entry until the engine attributes the local
/// connection.
pub const LOCAL_PLACEHOLDER_ID: &str = "local-placeholder";

/// Shown for a remote participant that has no name.
pub const DEFAULT_REMOTE_NAME: &str = "Guest";

/// Shown for the local participant when no name is known.
pub const DEFAULT_LOCAL_NAME: &str = "Me";

/// Deduplicated, ordered participant list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantRoster {
    entries: Vec<Participant>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Participant] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.entries.iter().find(|p| p.id == id)
    }

    pub fn local(&self) -> Option<&Participant> {
        self.entries.iter().find(|p| p.is_local)
    }

    pub fn local_count(&self) -> usize {
        self.entries.iter().filter(|p| p.is_local).count()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn has_duplicate_ids(&self) -> bool {
        let mut seen = HashSet::new();
        !self.entries.iter().all(|p| seen.insert(p.id.as_str()))
    }
}

/// Incremental roster change carried by a single engine event. Applied to
/// the cached engine listing when a fresh listing cannot be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterDelta {
    Upsert {
        id: String,
        display_name: Option<String>,
    },
    Remove {
        id: String,
    },
    Rename {
        id: String,
        display_name: Option<String>,
    },
    Avatar {
        id: String,
        avatar_url: Option<String>,
    },
    Role {
        id: String,
        role: String,
    },
}

impl RosterDelta {
    pub fn id(&self) -> &str {
        match self {
            RosterDelta::Upsert { id, .. }
            | RosterDelta::Remove { id }
            | RosterDelta::Rename { id, .. }
            | RosterDelta::Avatar { id, .. }
            | RosterDelta::Role { id, .. } => id,
        }
    }

    pub fn apply(&self, listing: &mut Vec<ReportedParticipant>) {
        let position = listing.iter().position(|r| r.id == self.id());
        match (self, position) {
            (RosterDelta::Remove { .. }, Some(i)) => {
                listing.remove(i);
            }
            (RosterDelta::Remove { .. }, None) => {}
            (RosterDelta::Upsert { id, display_name }, None) => {
                listing.push(ReportedParticipant {
                    id: id.clone(),
                    display_name: display_name.clone(),
                    ..Default::default()
                });
            }
            (RosterDelta::Upsert { display_name, .. }, Some(i))
            | (RosterDelta::Rename { display_name, .. }, Some(i)) => {
                if let Some(record) = listing.get_mut(i) {
                    if display_name.is_some() {
                        record.display_name = display_name.clone();
                    }
                }
            }
            (RosterDelta::Avatar { avatar_url, .. }, Some(i)) => {
                if let Some(record) = listing.get_mut(i) {
                    record.avatar_url = avatar_url.clone();
                }
            }
            (RosterDelta::Role { role, .. }, Some(i)) => {
                if let Some(record) = listing.get_mut(i) {
                    record.role = Some(role.clone());
                }
            }
            // Changes for someone we never saw join.
            (_, None) => {
                log::debug!("Roster change for unknown participant {}", self.id());
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn to_participant(record: &ReportedParticipant, fallback_name: &str, is_local: bool) -> Participant {
    Participant {
        id: record.id.clone(),
        display_name: non_empty(record.display_name.as_deref())
            .unwrap_or(fallback_name)
            .to_string(),
        avatar_url: non_empty(record.avatar_url.as_deref()).map(str::to_string),
        role: ParticipantRole::from_engine(record.role.as_deref()),
        is_local,
    }
}

fn placeholder(local_name: &str) -> Participant {
    Participant {
        id: LOCAL_PLACEHOLDER_ID.to_string(),
        display_name: local_name.to_string(),
        avatar_url: None,
        role: ParticipantRole::Participant,
        is_local: true,
    }
}

/// Find the engine record that stands for the local connection.
fn find_local_record<'a>(
    previous: &ParticipantRoster,
    reported: &'a [ReportedParticipant],
    local_name: &str,
) -> Option<&'a ReportedParticipant> {
    let usable = |r: &&ReportedParticipant| !r.id.is_empty() && r.id != LOCAL_PLACEHOLDER_ID;

    if let Some(explicit) = reported.iter().filter(usable).find(|r| r.local == Some(true)) {
        return Some(explicit);
    }

    let latest = |id: &str| reported.iter().filter(usable).rev().find(|r| r.id == id);

    match previous.local() {
        Some(local) if local.id != LOCAL_PLACEHOLDER_ID => latest(&local.id),
        _ => {
            // Unattributed: the most recent unflagged record that carries our
            // name and was not on the roster before.
            let flagged_remote = |id: &str| reported.iter().any(|r| r.id == id && r.local == Some(false));
            let candidate = reported
                .iter()
                .filter(usable)
                .rev()
                .filter(|r| r.local.is_none())
                .filter(|r| previous.get(&r.id).is_none())
                .filter(|r| !flagged_remote(&r.id))
                .find(|r| non_empty(r.display_name.as_deref()) == Some(local_name))?;
            latest(&candidate.id)
        }
    }
}

/// Merge an engine participant listing into the previous roster.
pub fn reconcile(
    previous: &ParticipantRoster,
    reported: &[ReportedParticipant],
    local_display_name: &str,
) -> ParticipantRoster {
    let local_name = non_empty(Some(local_display_name)).unwrap_or(DEFAULT_LOCAL_NAME);

    let local = match find_local_record(previous, reported, local_name) {
        Some(record) => to_participant(record, local_name, true),
        None => match previous.local() {
            Some(existing) if existing.id != LOCAL_PLACEHOLDER_ID => existing.clone(),
            _ => placeholder(local_name),
        },
    };

    let mut remotes: Vec<Participant> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in reported {
        if record.id.is_empty() || record.id == LOCAL_PLACEHOLDER_ID || record.id == local.id {
            continue;
        }
        if record.local == Some(true) {
            log::debug!("Ignoring second local record {}", record.id);
            continue;
        }
        let participant = to_participant(record, DEFAULT_REMOTE_NAME, false);
        match index.get(&record.id) {
            Some(&i) => {
                if let Some(slot) = remotes.get_mut(i) {
                    *slot = participant;
                }
            }
            None => {
                index.insert(record.id.clone(), remotes.len());
                remotes.push(participant);
            }
        }
    }

    let mut entries = Vec::with_capacity(remotes.len() + 1);
    let mut kept: HashSet<&str> = HashSet::new();
    let mut local_slot = None;
    for old in &previous.entries {
        if old.is_local {
            local_slot = Some(entries.len());
            entries.push(local.clone());
        } else if let Some(current) = index.get(&old.id).and_then(|&i| remotes.get(i)) {
            if kept.insert(current.id.as_str()) {
                entries.push(current.clone());
            }
        }
    }
    if local_slot.is_none() {
        entries.insert(0, local);
    }
    for remote in &remotes {
        if !kept.contains(remote.id.as_str()) {
            entries.push(remote.clone());
        }
    }

    ParticipantRoster { entries }
}
