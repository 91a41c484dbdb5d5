//! Inbound snapshot reconciliation.
//!
//! Every delivery from the remote subscription (foreign writes and the
//! device's own echoes alike) funnels through [`reconcile`]. The remote
//! store is the eventual source of truth: a field present in the snapshot
//! replaces the local value wholesale, superseding any in-flight optimistic
//! delta for that field. Snapshots are applied in delivery order, so the
//! latest snapshot wins.

use crate::{
    dao::models::GameDocument,
    state::game::{GameAggregate, SessionPhase},
};

/// Fold `snapshot` into `local`, returning the reconciled aggregate.
///
/// Absent fields keep their local value; malformed fields were already
/// coerced to empty/zero defaults when the snapshot was decoded at the
/// store boundary, so no coercion happens here.
pub fn reconcile(mut local: GameAggregate, snapshot: &GameDocument) -> GameAggregate {
    if let Some(player) = &snapshot.player {
        local.player = Some(player.clone().into());
    }
    if let Some(results) = &snapshot.results {
        local.results = results.iter().cloned().map(Into::into).collect();
    }
    if let Some(status) = snapshot.status {
        local.status = status;
    }
    if let Some(seconds) = snapshot.time_remaining {
        local.time_remaining = seconds;
    }
    if let Some(teams) = &snapshot.teams {
        local.teams = teams.clone().into();
    }

    local.phase = SessionPhase::Synced;
    local
}
