use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use strum_macros::{Display, EnumString};

pub const DEFAULT_STAGE: &str = "第一阶段";
pub const DEFAULT_FORMAT: &str = "bo1";
pub const DEFAULT_TIME: &str = "2026-02-01T20:00:00+08:00";
pub const TBA: &str = "tba";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub members: Vec<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub logo: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Team {
    /// A team seen for the first time: no members, no logo.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Read case-insensitively (`"Completed"` is `completed`), written lowercase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MatchStatus {
    #[default]
    Upcoming,
    Live,
    Completed,
    Tba,
}

impl TryFrom<String> for MatchStatus {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        MatchStatus::from_str(raw.trim()).map_err(|_| format!("unknown match status `{raw}`"))
    }
}

/// One side of a score: a number, the "tba" sentinel, or whatever free text
/// the operator typed. Numbers that are not plain integers (`1.5`) are kept
/// as written; `null` reads as the sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawScore", into = "RawScore")]
pub enum ScoreValue {
    #[default]
    Tba,
    Points(i64),
    Number(Number),
    Text(String),
}

impl ScoreValue {
    pub fn is_tba(&self) -> bool {
        matches!(self, ScoreValue::Tba)
    }
}

impl std::fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreValue::Tba => f.write_str(TBA),
            ScoreValue::Points(points) => write!(f, "{points}"),
            ScoreValue::Number(number) => write!(f, "{number}"),
            ScoreValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawScore {
    Points(i64),
    Number(Number),
    Text(String),
    Null,
}

impl From<RawScore> for ScoreValue {
    fn from(raw: RawScore) -> Self {
        match raw {
            RawScore::Null => ScoreValue::Tba,
            RawScore::Points(points) => ScoreValue::Points(points),
            RawScore::Number(number) => ScoreValue::Number(number),
            RawScore::Text(text) if text.trim().eq_ignore_ascii_case(TBA) => ScoreValue::Tba,
            RawScore::Text(text) => ScoreValue::Text(text),
        }
    }
}

impl From<ScoreValue> for RawScore {
    fn from(score: ScoreValue) -> Self {
        match score {
            ScoreValue::Tba => RawScore::Text(TBA.to_string()),
            ScoreValue::Points(points) => RawScore::Points(points),
            ScoreValue::Number(number) => RawScore::Number(number),
            ScoreValue::Text(text) => RawScore::Text(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamPair {
    #[serde(deserialize_with = "null_as_default")]
    pub a: String,
    #[serde(deserialize_with = "null_as_default")]
    pub b: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorePair {
    pub a: ScoreValue,
    pub b: ScoreValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default = "default_stage", deserialize_with = "stage_or_default")]
    pub stage: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: MatchStatus,
    #[serde(default = "default_format", deserialize_with = "format_or_default")]
    pub format: String,
    #[serde(default = "default_time", deserialize_with = "time_or_default")]
    pub time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: TeamPair,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: ScorePair,
    #[serde(default, deserialize_with = "null_as_default")]
    pub banpick: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub maps: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Hand-edited documents may carry `null` where a value is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn stage_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_stage))
}

fn format_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_format))
}

fn time_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_time))
}

fn default_stage() -> String {
    DEFAULT_STAGE.to_string()
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}

fn default_time() -> String {
    DEFAULT_TIME.to_string()
}

impl Match {
    /// A fresh record carrying placeholder schedule metadata.
    pub fn new(id: impl Into<String>, status: MatchStatus, teams: TeamPair, score: ScorePair) -> Self {
        Self {
            id: id.into(),
            stage: default_stage(),
            status,
            format: default_format(),
            time: default_time(),
            teams,
            score,
            banpick: Vec::new(),
            maps: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamsDocument {
    /// Kept in file order so a load and save leaves the document diffable.
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: IndexMap<String, Team>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchesDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub matches: Vec<Match>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
