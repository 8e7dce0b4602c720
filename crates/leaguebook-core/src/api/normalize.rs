// Ingestion-boundary normalization: NFL team abbreviations and provider stat
// field aliases.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Team abbreviations
// ---------------------------------------------------------------------------

/// Provider spellings that differ from the canonical (Sleeper) abbreviation.
const TEAM_ALIASES: &[(&str, &str)] = &[
    ("JAC", "JAX"),
    ("WSH", "WAS"),
    ("LA", "LAR"),
    ("STL", "LAR"),
    ("SD", "LAC"),
    ("OAK", "LV"),
    ("LVR", "LV"),
    ("GNB", "GB"),
    ("KAN", "KC"),
    ("NWE", "NE"),
    ("NOR", "NO"),
    ("SFO", "SF"),
    ("TAM", "TB"),
];

/// Canonical upper-case abbreviation for an NFL team.
pub fn normalize_team_abbr(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    TEAM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(upper)
}

// ---------------------------------------------------------------------------
// Stat lines
// ---------------------------------------------------------------------------

/// Field names each provider has used for the same stat, in lookup order.
const PPR_ALIASES: &[&str] = &["pts_ppr", "fantasy_points_ppr", "ppr"];
const HALF_PPR_ALIASES: &[&str] = &["pts_half_ppr", "fantasy_points_half_ppr", "half_ppr"];
const STD_ALIASES: &[&str] = &["pts_std", "pts_standard", "fantasy_points"];
const PASS_YD_ALIASES: &[&str] = &["pass_yd", "passing_yards", "pass_yds"];
const PASS_TD_ALIASES: &[&str] = &["pass_td", "passing_tds"];
const RUSH_YD_ALIASES: &[&str] = &["rush_yd", "rushing_yards", "rush_yds"];
const RUSH_TD_ALIASES: &[&str] = &["rush_td", "rushing_tds"];
const REC_ALIASES: &[&str] = &["rec", "receptions"];
const REC_YD_ALIASES: &[&str] = &["rec_yd", "receiving_yards", "rec_yds"];
const REC_TD_ALIASES: &[&str] = &["rec_td", "receiving_tds"];

/// Canonical stat record. Business logic only ever sees this type; the alias
/// tables above are the only place provider field names appear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub pts_ppr: Option<f64>,
    pub pts_half_ppr: Option<f64>,
    pub pts_std: Option<f64>,
    pub pass_yd: f64,
    pub pass_td: f64,
    pub rush_yd: f64,
    pub rush_td: f64,
    pub rec: f64,
    pub rec_yd: f64,
    pub rec_td: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringFormat {
    Ppr,
    HalfPpr,
    Standard,
}

impl StatLine {
    /// Build a stat line from a provider's stat object.
    pub fn from_map(stats: &Map<String, Value>) -> Self {
        let num = |aliases: &[&str]| lookup(stats, aliases);
        StatLine {
            pts_ppr: num(PPR_ALIASES),
            pts_half_ppr: num(HALF_PPR_ALIASES),
            pts_std: num(STD_ALIASES),
            pass_yd: num(PASS_YD_ALIASES).unwrap_or(0.0),
            pass_td: num(PASS_TD_ALIASES).unwrap_or(0.0),
            rush_yd: num(RUSH_YD_ALIASES).unwrap_or(0.0),
            rush_td: num(RUSH_TD_ALIASES).unwrap_or(0.0),
            rec: num(REC_ALIASES).unwrap_or(0.0),
            rec_yd: num(REC_YD_ALIASES).unwrap_or(0.0),
            rec_td: num(REC_TD_ALIASES).unwrap_or(0.0),
        }
    }

    /// Fantasy points in the given format. Providers that only publish one
    /// format get the others derived from receptions.
    pub fn points(&self, format: ScoringFormat) -> f64 {
        match format {
            ScoringFormat::Ppr => self
                .pts_ppr
                .or_else(|| self.pts_std.map(|s| s + self.rec))
                .unwrap_or(0.0),
            ScoringFormat::HalfPpr => self
                .pts_half_ppr
                .or_else(|| self.pts_std.map(|s| s + self.rec * 0.5))
                .or_else(|| self.pts_ppr.map(|p| p - self.rec * 0.5))
                .unwrap_or(0.0),
            ScoringFormat::Standard => self
                .pts_std
                .or_else(|| self.pts_ppr.map(|p| p - self.rec))
                .unwrap_or(0.0),
        }
    }
}

fn lookup(stats: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    aliases.iter().find_map(|key| match stats.get(*key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn team_aliases_are_normalized() {
        assert_eq!(normalize_team_abbr("JAC"), "JAX");
        assert_eq!(normalize_team_abbr("wsh"), "WAS");
        assert_eq!(normalize_team_abbr(" LA "), "LAR");
        assert_eq!(normalize_team_abbr("KC"), "KC");
    }

    #[test]
    fn sleeper_field_names_map_directly() {
        let line = StatLine::from_map(&stats(json!({
            "pts_ppr": 21.4, "pts_half_ppr": 19.4, "pts_std": 17.4,
            "rec": 4.0, "rec_yd": 74.0
        })));
        assert_eq!(line.points(ScoringFormat::Ppr), 21.4);
        assert_eq!(line.points(ScoringFormat::HalfPpr), 19.4);
        assert_eq!(line.points(ScoringFormat::Standard), 17.4);
        assert_eq!(line.rec_yd, 74.0);
    }

    #[test]
    fn alternate_provider_names_are_aliased() {
        let line = StatLine::from_map(&stats(json!({
            "fantasy_points_ppr": 12.0,
            "receptions": 6,
            "receiving_yards": "58"
        })));
        assert_eq!(line.pts_ppr, Some(12.0));
        assert_eq!(line.rec, 6.0);
        assert_eq!(line.rec_yd, 58.0);
    }

    #[test]
    fn missing_formats_are_derived_from_receptions() {
        let line = StatLine::from_map(&stats(json!({"pts_std": 10.0, "rec": 4.0})));
        assert_eq!(line.points(ScoringFormat::Ppr), 14.0);
        assert_eq!(line.points(ScoringFormat::HalfPpr), 12.0);

        let ppr_only = StatLine::from_map(&stats(json!({"pts_ppr": 14.0, "rec": 4.0})));
        assert_eq!(ppr_only.points(ScoringFormat::Standard), 10.0);
    }

    #[test]
    fn empty_stats_score_zero() {
        let line = StatLine::from_map(&Map::new());
        assert_eq!(line, StatLine::default());
        assert_eq!(line.points(ScoringFormat::Ppr), 0.0);
    }
}
