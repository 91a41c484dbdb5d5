use indexmap::IndexSet;
use uuid::Uuid;

use crate::dao::models::{
    MatchStatus, PlayerEntity, ScanCategory, ScanResultEntity, Team, TeamStateEntity, TeamsEntity,
};

/// Countdown seconds assumed before the operator pushes a real value.
pub const DEFAULT_TIME_REMAINING: u32 = 600;

/// Lifecycle of the local session relative to the shared document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// Neither the local cache nor a remote snapshot has been applied yet.
    #[default]
    Uninitialized,
    /// The aggregate reflects at least one load; mutations stay in this
    /// phase because the remote echo is confirmation, not a new state.
    Synced,
}

/// Identity of the player registered on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Display name chosen at registration.
    pub name: String,
    /// Team the player fights for.
    pub team: Team,
    /// Legacy per-player score carried for wire compatibility.
    pub score: u32,
}

/// One accepted scan and its awarded points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub category: ScanCategory,
    /// Derived from the category; never set independently.
    pub points: u32,
    /// RFC-3339 timestamp of the scan.
    pub timestamp: String,
    pub scan_id: Uuid,
    /// Team credited with the scan.
    pub team: Team,
}

impl ScanResult {
    /// Record an accepted scan for `team`, deriving the fixed point value.
    pub fn new(category: ScanCategory, scan_id: Uuid, team: Team, timestamp: String) -> Self {
        Self {
            category,
            points: category.points(),
            timestamp,
            scan_id,
            team,
        }
    }
}

/// A team's roster and cumulative score.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamState {
    /// Player names in insertion order; a name appears at most once.
    pub players: IndexSet<String>,
    /// Recomputed as the sum of the team's scan points, never incremented
    /// ad hoc.
    pub score: u32,
}

/// The fixed pair of teams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Teams {
    pub blue: TeamState,
    pub red: TeamState,
}

impl Teams {
    /// Mutably borrow the state of `team`.
    pub fn team_mut(&mut self, team: Team) -> &mut TeamState {
        match team {
            Team::Blue => &mut self.blue,
            Team::Red => &mut self.red,
        }
    }
}

/// Authoritative in-memory view of the shared game for this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameAggregate {
    pub phase: SessionPhase,
    pub player: Option<Player>,
    /// Every accepted scan known to this device, in arrival order.
    pub results: Vec<ScanResult>,
    pub status: MatchStatus,
    /// Countdown seconds as last pushed by the operator surface.
    pub time_remaining: u32,
    pub teams: Teams,
}

impl Default for GameAggregate {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            player: None,
            results: Vec::new(),
            status: MatchStatus::Waiting,
            time_remaining: DEFAULT_TIME_REMAINING,
            teams: Teams::default(),
        }
    }
}

impl GameAggregate {
    /// Whether `team` already scored the QR code identified by `scan_id`.
    pub fn scanned_by_team(&self, scan_id: Uuid, team: Team) -> bool {
        self.results
            .iter()
            .any(|result| result.scan_id == scan_id && result.team == team)
    }

    /// Sum of the points scored by `team` across all known results.
    pub fn team_points(&self, team: Team) -> u32 {
        self.results
            .iter()
            .filter(|result| result.team == team)
            .map(|result| result.points)
            .sum()
    }

    /// Total points across all known results on this device.
    pub fn total_score(&self) -> u32 {
        self.results.iter().map(|result| result.points).sum()
    }

    /// Flat list of every scanned QR id, regardless of team.
    pub fn scanned_ids(&self) -> Vec<Uuid> {
        self.results.iter().map(|result| result.scan_id).collect()
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            name: value.name,
            team: value.team,
            score: value.score,
        }
    }
}

impl From<Player> for PlayerEntity {
    fn from(value: Player) -> Self {
        Self {
            name: value.name,
            team: value.team,
            score: value.score,
        }
    }
}

impl From<ScanResultEntity> for ScanResult {
    fn from(value: ScanResultEntity) -> Self {
        Self {
            category: value.category,
            points: value.points,
            timestamp: value.timestamp,
            scan_id: value.scan_id,
            team: value.team,
        }
    }
}

impl From<ScanResult> for ScanResultEntity {
    fn from(value: ScanResult) -> Self {
        Self {
            category: value.category,
            points: value.points,
            timestamp: value.timestamp,
            scan_id: value.scan_id,
            team: value.team,
        }
    }
}

impl From<TeamStateEntity> for TeamState {
    fn from(value: TeamStateEntity) -> Self {
        Self {
            players: value.players,
            score: value.score,
        }
    }
}

impl From<TeamState> for TeamStateEntity {
    fn from(value: TeamState) -> Self {
        Self {
            players: value.players,
            score: value.score,
        }
    }
}

impl From<TeamsEntity> for Teams {
    fn from(value: TeamsEntity) -> Self {
        Self {
            blue: value.blue.into(),
            red: value.red.into(),
        }
    }
}

impl From<Teams> for TeamsEntity {
    fn from(value: Teams) -> Self {
        Self {
            blue: value.blue.into(),
            red: value.red.into(),
        }
    }
}
