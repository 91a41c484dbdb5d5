use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, VecSkipError, serde_as};
use uuid::Uuid;

/// Team identity as stored in the shared document (`teams.blue` / `teams.red`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Blue,
    Red,
}

/// Category token printed inside a QR payload, ordered by awarded points.
///
/// The wire vocabulary (`verde`/`laranja`/`vermelho`) is baked into the
/// printed QR codes and the shared document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanCategory {
    /// 1 point.
    #[serde(rename = "verde")]
    Low,
    /// 3 points.
    #[serde(rename = "laranja")]
    Mid,
    /// 5 points.
    #[serde(rename = "vermelho")]
    High,
}

impl ScanCategory {
    /// Fixed point value awarded for this category.
    pub fn points(self) -> u32 {
        match self {
            ScanCategory::Low => 1,
            ScanCategory::Mid => 3,
            ScanCategory::High => 5,
        }
    }

    /// Parse a payload token, rejecting anything outside the fixed set.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "verde" => Some(ScanCategory::Low),
            "laranja" => Some(ScanCategory::Mid),
            "vermelho" => Some(ScanCategory::High),
            _ => None,
        }
    }
}

/// Match lifecycle as driven by the operator surface; clients only observe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Pre-game lobby.
    #[default]
    Waiting,
    /// Scanning is open.
    Active,
    /// Final scores are frozen.
    Finished,
}

/// Player identity blob persisted locally and mirrored in the document's
/// legacy `player` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntity {
    /// Display name chosen at registration.
    pub name: String,
    /// Team the player registered into.
    pub team: Team,
    /// Legacy per-player score; team score is the authoritative number.
    #[serde(default)]
    pub score: u32,
}

/// One accepted scan as stored in the shared document's `results` array.
///
/// The legacy wire names (`color`, `date`, `id`) are kept so existing
/// documents and printed codes stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResultEntity {
    #[serde(rename = "color")]
    pub category: ScanCategory,
    pub points: u32,
    /// RFC-3339 timestamp of the scan.
    #[serde(rename = "date")]
    pub timestamp: String,
    /// Unique identifier of the scanned QR code.
    #[serde(rename = "id")]
    pub scan_id: Uuid,
    /// Team credited with the scan.
    pub team: Team,
}

/// Roster and score of one team as stored under `teams.<key>`.
///
/// Both fields are coerced to their empty/zero defaults when a foreign
/// writer left them missing or malformed.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStateEntity {
    /// Player names in insertion order; duplicates collapse on decode.
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub players: IndexSet<String>,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub score: u32,
}

/// The fixed two-team container under the document's `teams` field.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamsEntity {
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub blue: TeamStateEntity,
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub red: TeamStateEntity,
}

impl TeamsEntity {
    /// Mutably borrow the state of `team`.
    pub fn team_mut(&mut self, team: Team) -> &mut TeamStateEntity {
        match team {
            Team::Blue => &mut self.blue,
            Team::Red => &mut self.red,
        }
    }
}

/// Full snapshot of the single shared game document.
///
/// Every field is optional on the read side: an absent field leaves the
/// corresponding local value untouched during reconciliation, while a
/// present-but-malformed field decodes to `None` (scalar shapes) or drops
/// the offending entries (`VecSkipError` on the arrays) instead of failing
/// the whole snapshot.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub player: Option<PlayerEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_as(deserialize_as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub results: Option<Vec<ScanResultEntity>>,
    /// Flat list of every scanned QR id, regardless of team.
    #[serde(
        rename = "scannedQRCodes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[serde_as(deserialize_as = "DefaultOnError<Option<VecSkipError<_>>>")]
    pub scanned_qr_codes: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub status: Option<MatchStatus>,
    /// Countdown seconds pushed by the operator surface.
    #[serde(
        rename = "timeRemaining",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub time_remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub teams: Option<TeamsEntity>,
    /// Legacy flag kept for document compatibility; written on reset,
    /// never read back.
    #[serde(
        rename = "gameStarted",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub game_started: Option<bool>,
}

/// Merge-write payload: only populated fields are patched into the shared
/// document, everything else is left untouched.
///
/// `player` is doubly optional so "leave as-is" (`None`) and "clear the
/// field" (`Some(None)`) stay distinguishable.
#[derive(Debug, Clone, Default)]
pub struct GamePatch {
    pub player: Option<Option<PlayerEntity>>,
    pub results: Option<Vec<ScanResultEntity>>,
    pub scanned_qr_codes: Option<Vec<Uuid>>,
    pub teams: Option<TeamsEntity>,
    pub game_started: Option<bool>,
}

impl GamePatch {
    /// Merge the populated fields of this patch into `doc`.
    pub fn apply_to(&self, doc: &mut GameDocument) {
        if let Some(player) = &self.player {
            doc.player = player.clone();
        }
        if let Some(results) = &self.results {
            doc.results = Some(results.clone());
        }
        if let Some(scanned) = &self.scanned_qr_codes {
            doc.scanned_qr_codes = Some(scanned.clone());
        }
        if let Some(teams) = &self.teams {
            doc.teams = Some(teams.clone());
        }
        if let Some(flag) = self.game_started {
            doc.game_started = Some(flag);
        }
    }
}
