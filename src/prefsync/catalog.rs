//! Static column definitions for every grid, and the default document built
//! from them.
//!
//! The host application owns this configuration; the defaults here describe
//! the league manager's grids. A column's `default_visible` flag decides
//! whether it appears in the default `columns` list, in declaration order.

use crate::model::{
    GridKey, GridPreference, GridPreferences, PreferenceDocument, SortDirection, UiPreferences,
};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub key: &'static str,
    pub label: &'static str,
    pub default_visible: bool,
}

const fn col(key: &'static str, label: &'static str, default_visible: bool) -> ColumnDef {
    ColumnDef {
        key,
        label,
        default_visible,
    }
}

const ROSTER_COLUMNS: &[ColumnDef] = &[
    col("name", "Name", true),
    col("position", "Pos", true),
    col("jersey", "#", true),
    col("age", "Age", true),
    col("overall", "OVR", true),
    col("potential", "POT", false),
    col("experience", "Exp", false),
    col("height", "Height", false),
    col("weight", "Weight", false),
    col("college", "College", false),
    col("contract", "Contract", true),
    col("status", "Status", true),
];

const ROSTER_OFFENSE_COLUMNS: &[ColumnDef] = &[
    col("name", "Name", true),
    col("position", "Pos", true),
    col("overall", "OVR", true),
    col("speed", "SPD", true),
    col("strength", "STR", false),
    col("awareness", "AWR", true),
    col("throwPower", "THP", false),
    col("throwAccuracy", "THA", false),
    col("catching", "CTH", false),
    col("carrying", "CAR", false),
    col("runBlock", "RBK", false),
    col("passBlock", "PBK", false),
];

const ROSTER_DEFENSE_COLUMNS: &[ColumnDef] = &[
    col("name", "Name", true),
    col("position", "Pos", true),
    col("overall", "OVR", true),
    col("speed", "SPD", true),
    col("strength", "STR", true),
    col("awareness", "AWR", false),
    col("tackle", "TAK", true),
    col("passRush", "PRS", false),
    col("coverage", "COV", false),
    col("pursuit", "PUR", false),
];

const ROSTER_SPECIAL_TEAMS_COLUMNS: &[ColumnDef] = &[
    col("name", "Name", true),
    col("position", "Pos", true),
    col("overall", "OVR", true),
    col("kickPower", "KPW", true),
    col("kickAccuracy", "KAC", true),
    col("returnSkill", "RET", false),
];

const DEPTH_CHART_COLUMNS: &[ColumnDef] = &[
    col("slot", "Slot", true),
    col("position", "Pos", true),
    col("name", "Name", true),
    col("overall", "OVR", true),
    col("age", "Age", false),
    col("status", "Status", false),
];

const STANDINGS_COLUMNS: &[ColumnDef] = &[
    col("team", "Team", true),
    col("wins", "W", true),
    col("losses", "L", true),
    col("ties", "T", true),
    col("winPct", "PCT", true),
    col("pointsFor", "PF", true),
    col("pointsAgainst", "PA", true),
    col("pointDiff", "DIFF", false),
    col("streak", "STRK", false),
    col("divisionRecord", "DIV", false),
    col("conferenceRecord", "CONF", false),
];

/// Column definitions for a grid, in declaration order.
pub fn columns_for(grid: GridKey) -> &'static [ColumnDef] {
    match grid {
        GridKey::Roster | GridKey::RosterAll => ROSTER_COLUMNS,
        GridKey::RosterOffense => ROSTER_OFFENSE_COLUMNS,
        GridKey::RosterDefense => ROSTER_DEFENSE_COLUMNS,
        GridKey::RosterSpecialTeams => ROSTER_SPECIAL_TEAMS_COLUMNS,
        GridKey::DepthChart => DEPTH_CHART_COLUMNS,
        GridKey::Standings => STANDINGS_COLUMNS,
    }
}

/// Keys of the default-visible columns, in declaration order.
pub fn default_visible(defs: &[ColumnDef]) -> Vec<String> {
    defs.iter()
        .filter(|def| def.default_visible)
        .map(|def| def.key.to_string())
        .collect()
}

pub fn default_grid(grid: GridKey) -> GridPreference {
    let mut pref = GridPreference::with_columns(default_visible(columns_for(grid)));
    if grid == GridKey::Standings {
        pref.sort_column = Some("winPct".to_string());
        pref.sort_direction = Some(SortDirection::Desc);
    }
    pref
}

/// The hardcoded default document every server document is merged over.
pub static DEFAULT_PREFERENCES: Lazy<PreferenceDocument> = Lazy::new(|| PreferenceDocument {
    ui: UiPreferences::default(),
    team_color_schemes: BTreeMap::new(),
    grids: GridPreferences {
        roster: default_grid(GridKey::Roster),
        roster_all: default_grid(GridKey::RosterAll),
        roster_offense: default_grid(GridKey::RosterOffense),
        roster_defense: default_grid(GridKey::RosterDefense),
        roster_special_teams: default_grid(GridKey::RosterSpecialTeams),
        depth_chart: default_grid(GridKey::DepthChart),
        standings: default_grid(GridKey::Standings),
    },
});

pub fn default_preferences() -> PreferenceDocument {
    DEFAULT_PREFERENCES.clone()
}
