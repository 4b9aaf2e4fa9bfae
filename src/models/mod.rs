use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Client-assigned record identifier (milliseconds since epoch at creation).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Serialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum Status {
    #[default]
    Exploring,
    Active,
    #[serde(rename = "On Hold")]
    #[strum(serialize = "On Hold")]
    OnHold,
    #[serde(rename = "Not a Fit")]
    #[strum(serialize = "Not a Fit")]
    NotAFit,
    Complete,
}

// Remote rows are edited by hand in a spreadsheet; an unknown status must not
// take the whole envelope down with it.
impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|s| Status::from_str(s.trim()).ok())
            .unwrap_or_default())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct IdeaDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub blockers: String,
    #[serde(default)]
    pub gaps: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Idea {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: IdeaDraft,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct WinDraft {
    #[serde(default)]
    pub title: String,
    /// Free-text date label ("Fall 2024").
    #[serde(default)]
    pub when: String,
    #[serde(default)]
    pub impact: String,
    #[serde(rename = "grantUse", default)]
    pub grant_use: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Win {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: WinDraft,
}

/// The combined unit that is persisted locally and sent to the remote.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    #[serde(default)]
    pub ideas: Vec<Idea>,
    #[serde(default)]
    pub wins: Vec<Win>,
}

/// An envelope as read back from storage or the remote, where either field
/// may be absent. Absent (or null) fields leave the current value alone.
///
/// Rows that do not parse (no `id`, wrong types) are skipped one by one, so a
/// single bad spreadsheet row does not cost the rest of the list.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialEnvelope {
    #[serde(default, deserialize_with = "readable_rows")]
    pub ideas: Option<Vec<Idea>>,
    #[serde(default, deserialize_with = "readable_rows")]
    pub wins: Option<Vec<Win>>,
}

fn readable_rows<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(rows) = Option::<Vec<serde_json::Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let kept = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(r) => Some(r),
            Err(e) => {
                log::warn!("skipping unreadable planner row: {e}");
                None
            }
        })
        .collect();
    Ok(Some(kept))
}

impl PartialEnvelope {
    pub fn is_empty(&self) -> bool {
        self.ideas.is_none() && self.wins.is_none()
    }
}

impl Envelope {
    /// Field-by-field overlay: present fields replace, absent ones are kept.
    pub fn overlay(&mut self, other: PartialEnvelope) {
        if let Some(ideas) = other.ideas {
            self.ideas = ideas;
        }
        if let Some(wins) = other.wins {
            self.wins = wins;
        }
    }
}

impl From<Envelope> for PartialEnvelope {
    fn from(e: Envelope) -> Self {
        Self {
            ideas: Some(e.ideas),
            wins: Some(e.wins),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tab {
    #[default]
    Ideas,
    Wins,
}
