//! Form-driven edits of the two documents.
//!
//! The editing form only exposes a subset of each record. Everything else
//! (team members and logo, match schedule and ban/pick history) is carried
//! over from the record already on file.

use thiserror::Error;

use crate::models::{
    Match, MatchStatus, MatchesDocument, ScorePair, ScoreValue, Team, TeamPair, TeamsDocument,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("team id must not be empty")]
    EmptyTeamId,
    #[error("match id must not be empty")]
    EmptyMatchId,
    #[error("no team with id `{0}`")]
    TeamNotFound(String),
    #[error("no match at position {index} (only {len} matches)")]
    MatchIndexOutOfRange { index: usize, len: usize },
    #[error("match at position {index} is `{found}`, not `{expected}`; reload and select again")]
    StalePosition {
        index: usize,
        expected: String,
        found: String,
    },
}

/// Where an upserted match ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted(usize),
    Updated(usize),
}

/// The fields the match form edits. Scores are raw operator input.
#[derive(Debug, Clone, Default)]
pub struct MatchForm {
    pub id: String,
    pub status: MatchStatus,
    pub team_a: String,
    pub team_b: String,
    pub score_a: String,
    pub score_b: String,
}

/// Lenient score input: blank or "tba" is the sentinel, digits are points,
/// anything else is kept as typed.
pub fn parse_score(input: &str) -> ScoreValue {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();
    if lowered.is_empty() || lowered == crate::models::TBA {
        return ScoreValue::Tba;
    }
    match lowered.parse::<i64>() {
        Ok(points) => ScoreValue::Points(points),
        Err(_) => ScoreValue::Text(trimmed.to_string()),
    }
}

impl TeamsDocument {
    /// Adds or updates a team. When `selected` names a different existing key
    /// the record is moved to `id` first, so a rename keeps members and logo.
    /// New and renamed teams go to the end of the document.
    pub fn upsert_team(&mut self, selected: Option<&str>, id: &str, name: &str) -> Result<&Team, EditError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(EditError::EmptyTeamId);
        }
        if let Some(old_id) = selected.map(str::trim).filter(|old| *old != id) {
            if let Some(moved) = self.teams.shift_remove(old_id) {
                log::debug!("renaming team {old_id} -> {id}");
                self.teams.insert(id.to_string(), moved);
            }
        }
        let team = self
            .teams
            .entry(id.to_string())
            .or_insert_with(|| Team::new(""));
        team.name = name.trim().to_string();
        Ok(team)
    }

    /// Matches referring to the team are left dangling.
    pub fn delete_team(&mut self, id: &str) -> Result<Team, EditError> {
        self.teams
            .shift_remove(id)
            .ok_or_else(|| EditError::TeamNotFound(id.to_string()))
    }
}

impl MatchesDocument {
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.matches.iter().position(|m| m.id == id)
    }

    /// Overwrites status, teams and score of the match with the same id in
    /// place, or appends a new match with placeholder schedule metadata.
    pub fn upsert_match(&mut self, form: &MatchForm) -> Result<Upserted, EditError> {
        let id = form.id.trim();
        if id.is_empty() {
            return Err(EditError::EmptyMatchId);
        }
        let teams = TeamPair {
            a: form.team_a.trim().to_string(),
            b: form.team_b.trim().to_string(),
        };
        let score = ScorePair {
            a: parse_score(&form.score_a),
            b: parse_score(&form.score_b),
        };
        let fresh = Match::new(id, form.status, teams, score);
        match self.position_of(id) {
            Some(index) => {
                let old = &self.matches[index];
                let updated = Match {
                    stage: old.stage.clone(),
                    format: old.format.clone(),
                    time: old.time.clone(),
                    banpick: old.banpick.clone(),
                    maps: old.maps.clone(),
                    extra: old.extra.clone(),
                    ..fresh
                };
                self.matches[index] = updated;
                Ok(Upserted::Updated(index))
            }
            None => {
                self.matches.push(fresh);
                Ok(Upserted::Inserted(self.matches.len() - 1))
            }
        }
    }

    /// Deletes by position, but only if the entry there is still the one the
    /// operator confirmed. Positions of every later match shift down by one.
    pub fn delete_match(&mut self, index: usize, expected_id: &str) -> Result<Match, EditError> {
        let len = self.matches.len();
        let found = self
            .matches
            .get(index)
            .ok_or(EditError::MatchIndexOutOfRange { index, len })?;
        if found.id != expected_id {
            return Err(EditError::StalePosition {
                index,
                expected: expected_id.to_string(),
                found: found.id.clone(),
            });
        }
        Ok(self.matches.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_FORMAT, DEFAULT_STAGE, DEFAULT_TIME};
    use serde_json::json;

    fn form(id: &str, status: MatchStatus, a: &str, b: &str) -> MatchForm {
        MatchForm {
            id: id.to_string(),
            status,
            team_a: "rdfz".to_string(),
            team_b: "bnds".to_string(),
            score_a: a.to_string(),
            score_b: b.to_string(),
        }
    }

    #[test]
    fn score_parsing() {
        assert_eq!(parse_score("TBA"), ScoreValue::Tba);
        assert_eq!(parse_score(""), ScoreValue::Tba);
        assert_eq!(parse_score("   "), ScoreValue::Tba);
        assert_eq!(parse_score(" 3 "), ScoreValue::Points(3));
        assert_eq!(parse_score("abc"), ScoreValue::Text("abc".to_string()));
        assert_eq!(parse_score(" W/O "), ScoreValue::Text("W/O".to_string()));
    }

    #[test]
    fn new_team_starts_empty() {
        let mut doc = TeamsDocument::default();
        doc.upsert_team(None, "rdfz", "RDFZ").unwrap();
        let team = &doc.teams["rdfz"];
        assert_eq!(team.name, "RDFZ");
        assert!(team.members.is_empty());
        assert!(team.logo.is_empty());
    }

    #[test]
    fn existing_team_keeps_members_and_logo() {
        let mut doc = TeamsDocument::default();
        doc.upsert_team(None, "rdfz", "RDFZ").unwrap();
        {
            let team = doc.teams.get_mut("rdfz").unwrap();
            team.members = vec![json!("alice")];
            team.logo = "img/rdfz.png".to_string();
        }
        doc.upsert_team(Some("rdfz"), "rdfz", "人大附中").unwrap();
        let team = &doc.teams["rdfz"];
        assert_eq!(team.name, "人大附中");
        assert_eq!(team.members, vec![json!("alice")]);
        assert_eq!(team.logo, "img/rdfz.png");
    }

    #[test]
    fn rename_moves_the_record() {
        let mut doc = TeamsDocument::default();
        doc.upsert_team(None, "old", "Old Name").unwrap();
        doc.teams.get_mut("old").unwrap().logo = "img/logo.png".to_string();
        doc.upsert_team(Some("old"), "new", "New Name").unwrap();
        assert!(!doc.teams.contains_key("old"));
        let team = &doc.teams["new"];
        assert_eq!(team.name, "New Name");
        assert_eq!(team.logo, "img/logo.png");
    }

    #[test]
    fn deletes_and_renames_keep_the_order_of_other_teams() {
        let mut doc = TeamsDocument::default();
        for id in ["c", "a", "b"] {
            doc.upsert_team(None, id, id).unwrap();
        }
        doc.delete_team("c").unwrap();
        doc.upsert_team(Some("a"), "d", "D").unwrap();
        assert_eq!(doc.teams.keys().collect::<Vec<_>>(), ["b", "d"]);
    }

    #[test]
    fn rename_from_unknown_selection_creates_fresh_team() {
        let mut doc = TeamsDocument::default();
        doc.upsert_team(Some("ghost"), "new", "New").unwrap();
        assert_eq!(doc.teams.len(), 1);
        assert_eq!(doc.teams["new"], Team::new("New"));
    }

    #[test]
    fn blank_team_id_is_rejected() {
        let mut doc = TeamsDocument::default();
        assert_eq!(doc.upsert_team(None, "  ", "x").unwrap_err(), EditError::EmptyTeamId);
        assert!(doc.teams.is_empty());
    }

    #[test]
    fn deleting_a_team_ignores_matches() {
        let mut doc = TeamsDocument::default();
        doc.upsert_team(None, "rdfz", "RDFZ").unwrap();
        assert_eq!(doc.delete_team("rdfz").unwrap().name, "RDFZ");
        assert_eq!(
            doc.delete_team("rdfz").unwrap_err(),
            EditError::TeamNotFound("rdfz".to_string())
        );
    }

    #[test]
    fn new_match_is_appended_with_placeholders() {
        let mut doc = MatchesDocument::default();
        let outcome = doc
            .upsert_match(&form("m1", MatchStatus::Upcoming, "", "tba"))
            .unwrap();
        assert_eq!(outcome, Upserted::Inserted(0));
        let m = &doc.matches[0];
        assert_eq!(m.stage, DEFAULT_STAGE);
        assert_eq!(m.format, DEFAULT_FORMAT);
        assert_eq!(m.time, DEFAULT_TIME);
        assert!(m.banpick.is_empty() && m.maps.is_empty());
        assert!(m.score.a.is_tba() && m.score.b.is_tba());
    }

    #[test]
    fn existing_match_keeps_schedule_and_history_in_place() {
        let mut doc = MatchesDocument::default();
        doc.upsert_match(&form("m1", MatchStatus::Upcoming, "", "")).unwrap();
        doc.upsert_match(&form("m2", MatchStatus::Upcoming, "", "")).unwrap();
        {
            let m = &mut doc.matches[0];
            m.stage = "决赛".to_string();
            m.format = "bo3".to_string();
            m.time = "2026-03-01T19:00:00+08:00".to_string();
            m.banpick = vec![json!({"ban": "inferno"})];
            m.maps = vec![json!({"map": "mirage", "score": {"a": 13, "b": 9}})];
        }
        let outcome = doc
            .upsert_match(&form("m1", MatchStatus::Completed, "2", "1"))
            .unwrap();
        assert_eq!(outcome, Upserted::Updated(0));
        assert_eq!(doc.matches.len(), 2);
        let m = &doc.matches[0];
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.score.a, ScoreValue::Points(2));
        assert_eq!(m.score.b, ScoreValue::Points(1));
        assert_eq!(m.stage, "决赛");
        assert_eq!(m.format, "bo3");
        assert_eq!(m.time, "2026-03-01T19:00:00+08:00");
        assert_eq!(m.banpick, vec![json!({"ban": "inferno"})]);
        assert_eq!(m.maps.len(), 1);
        assert_eq!(doc.matches[1].id, "m2");
    }

    #[test]
    fn delete_checks_the_confirmed_id() {
        let mut doc = MatchesDocument::default();
        for id in ["m1", "m2", "m3"] {
            doc.upsert_match(&form(id, MatchStatus::Tba, "", "")).unwrap();
        }
        assert_eq!(doc.delete_match(0, "m1").unwrap().id, "m1");
        // m3 shifted from position 2 to 1
        assert_eq!(
            doc.delete_match(2, "m3").unwrap_err(),
            EditError::MatchIndexOutOfRange { index: 2, len: 2 }
        );
        assert!(matches!(
            doc.delete_match(0, "m3"),
            Err(EditError::StalePosition { .. })
        ));
        let index = doc.position_of("m3").unwrap();
        assert_eq!(doc.delete_match(index, "m3").unwrap().id, "m3");
        assert_eq!(doc.matches.len(), 1);
    }
}
