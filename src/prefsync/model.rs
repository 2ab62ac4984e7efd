use crate::filter::{self, NumericFilterValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub type TeamId = u32;

/// The stored theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    /// Resolves to a concrete theme, consulting `system` only for [`Theme::System`].
    pub fn resolve(self, system: ResolvedTheme) -> ResolvedTheme {
        match self {
            Theme::Light => ResolvedTheme::Light,
            Theme::Dark => ResolvedTheme::Dark,
            Theme::System => system,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
            Theme::System => write!(f, "system"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(format!("Invalid theme: {} (expected light, dark or system)", other)),
        }
    }
}

/// The concrete light/dark value applied to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for ResolvedTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedTheme::Light => write!(f, "light"),
            ResolvedTheme::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamColorScheme {
    pub primary: String,
    pub secondary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

impl TeamColorScheme {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            accent: None,
        }
    }

    pub fn with_accent(mut self, accent: impl Into<String>) -> Self {
        self.accent = Some(accent.into());
        self
    }

    /// Returns the first color that is not `#rgb` / `#rrggbb`, if any.
    pub fn invalid_color(&self) -> Option<&str> {
        [Some(&self.primary), Some(&self.secondary), self.accent.as_ref()]
            .into_iter()
            .flatten()
            .find(|color| !is_hex_color(color))
            .map(String::as_str)
    }
}

pub fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("Invalid sort direction: {}", other)),
        }
    }
}

/// The closed set of grids that carry preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GridKey {
    Roster,
    RosterAll,
    RosterOffense,
    RosterDefense,
    RosterSpecialTeams,
    DepthChart,
    Standings,
}

impl GridKey {
    pub const ALL: [GridKey; 7] = [
        GridKey::Roster,
        GridKey::RosterAll,
        GridKey::RosterOffense,
        GridKey::RosterDefense,
        GridKey::RosterSpecialTeams,
        GridKey::DepthChart,
        GridKey::Standings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GridKey::Roster => "roster",
            GridKey::RosterAll => "rosterAll",
            GridKey::RosterOffense => "rosterOffense",
            GridKey::RosterDefense => "rosterDefense",
            GridKey::RosterSpecialTeams => "rosterSpecialTeams",
            GridKey::DepthChart => "depthChart",
            GridKey::Standings => "standings",
        }
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the wire name (`rosterAll`) as well as `roster-all` / `roster_all`.
impl FromStr for GridKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        GridKey::ALL
            .into_iter()
            .find(|key| key.as_str().to_ascii_lowercase() == folded)
            .ok_or_else(|| format!("Unknown grid: {}", s))
    }
}

/// Display state of one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPreference {
    /// Visible columns in display order.
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_widths: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub numeric_filters: BTreeMap<String, NumericFilterValue>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub position_filter: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub status_filter: BTreeSet<String>,
}

impl GridPreference {
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            column_widths: BTreeMap::new(),
            sort_column: None,
            sort_direction: None,
            numeric_filters: BTreeMap::new(),
            position_filter: BTreeSet::new(),
            status_filter: BTreeSet::new(),
        }
    }

    /// Shallow merge: every field present in `patch` replaces the current one.
    pub fn apply(&mut self, patch: GridPreferencePatch) {
        if let Some(columns) = patch.columns {
            self.columns = columns;
        }
        if let Some(widths) = patch.column_widths {
            self.column_widths = widths;
        }
        if let Some(column) = patch.sort_column {
            self.sort_column = Some(column);
        }
        if let Some(direction) = patch.sort_direction {
            self.sort_direction = Some(direction);
        }
        if let Some(filters) = patch.numeric_filters {
            self.numeric_filters = filters;
        }
        if let Some(positions) = patch.position_filter {
            self.position_filter = positions;
        }
        if let Some(statuses) = patch.status_filter {
            self.status_filter = statuses;
        }
    }

    /// Whether a row passes every filter of this grid.
    ///
    /// `numeric` looks up the row's value for a column key; numeric filters
    /// are combined with AND.
    pub fn row_passes<F>(&self, numeric: F, position: Option<&str>, status: Option<&str>) -> bool
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.numeric_filters
            .iter()
            .all(|(column, f)| filter::evaluate(numeric(column), Some(f)))
            && filter::category_matches(position, &self.position_filter)
            && filter::category_matches(status, &self.status_filter)
    }
}

/// A partial change to one grid. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridPreferencePatch {
    pub columns: Option<Vec<String>>,
    pub column_widths: Option<BTreeMap<String, u32>>,
    pub sort_column: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub numeric_filters: Option<BTreeMap<String, NumericFilterValue>>,
    pub position_filter: Option<BTreeSet<String>>,
    pub status_filter: Option<BTreeSet<String>>,
}

impl GridPreferencePatch {
    pub fn columns(columns: Vec<String>) -> Self {
        Self {
            columns: Some(columns),
            ..Default::default()
        }
    }

    pub fn column_widths(widths: BTreeMap<String, u32>) -> Self {
        Self {
            column_widths: Some(widths),
            ..Default::default()
        }
    }
}

/// Preferences for every grid; each key of [`GridKey`] is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPreferences {
    pub roster: GridPreference,
    pub roster_all: GridPreference,
    pub roster_offense: GridPreference,
    pub roster_defense: GridPreference,
    pub roster_special_teams: GridPreference,
    pub depth_chart: GridPreference,
    pub standings: GridPreference,
}

impl GridPreferences {
    pub fn get(&self, key: GridKey) -> &GridPreference {
        match key {
            GridKey::Roster => &self.roster,
            GridKey::RosterAll => &self.roster_all,
            GridKey::RosterOffense => &self.roster_offense,
            GridKey::RosterDefense => &self.roster_defense,
            GridKey::RosterSpecialTeams => &self.roster_special_teams,
            GridKey::DepthChart => &self.depth_chart,
            GridKey::Standings => &self.standings,
        }
    }

    pub fn get_mut(&mut self, key: GridKey) -> &mut GridPreference {
        match key {
            GridKey::Roster => &mut self.roster,
            GridKey::RosterAll => &mut self.roster_all,
            GridKey::RosterOffense => &mut self.roster_offense,
            GridKey::RosterDefense => &mut self.roster_defense,
            GridKey::RosterSpecialTeams => &mut self.roster_special_teams,
            GridKey::DepthChart => &mut self.depth_chart,
            GridKey::Standings => &mut self.standings,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridKey, &GridPreference)> {
        GridKey::ALL.into_iter().map(move |key| (key, self.get(key)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiPreferences {
    pub theme: Theme,
}

/// The canonical, fully defaulted preference document of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceDocument {
    pub ui: UiPreferences,
    #[serde(default)]
    pub team_color_schemes: BTreeMap<TeamId, TeamColorScheme>,
    pub grids: GridPreferences,
}

impl PreferenceDocument {
    pub fn theme(&self) -> Theme {
        self.ui.theme
    }

    pub fn grid(&self, key: GridKey) -> &GridPreference {
        self.grids.get(key)
    }

    pub fn team_color_scheme(&self, team: TeamId) -> Option<&TeamColorScheme> {
        self.team_color_schemes.get(&team)
    }

    /// Shallow merge at the top level: each present section replaces the current one.
    pub fn apply(&mut self, patch: PreferencePatch) {
        if let Some(ui) = patch.ui {
            self.ui = ui;
        }
        if let Some(schemes) = patch.team_color_schemes {
            self.team_color_schemes = schemes;
        }
        if let Some(grids) = patch.grids {
            self.grids = grids;
        }
    }
}

/// A partial change to the whole document, one optional entry per section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencePatch {
    pub ui: Option<UiPreferences>,
    pub team_color_schemes: Option<BTreeMap<TeamId, TeamColorScheme>>,
    pub grids: Option<GridPreferences>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOperator;

    #[test]
    fn theme_resolution() {
        assert_eq!(Theme::Light.resolve(ResolvedTheme::Dark), ResolvedTheme::Light);
        assert_eq!(Theme::Dark.resolve(ResolvedTheme::Light), ResolvedTheme::Dark);
        assert_eq!(Theme::System.resolve(ResolvedTheme::Dark), ResolvedTheme::Dark);
        assert_eq!(Theme::System.resolve(ResolvedTheme::Light), ResolvedTheme::Light);
    }

    #[test]
    fn grid_key_parsing_is_lenient() {
        assert_eq!("rosterAll".parse::<GridKey>(), Ok(GridKey::RosterAll));
        assert_eq!("roster-special-teams".parse::<GridKey>(), Ok(GridKey::RosterSpecialTeams));
        assert_eq!("depth_chart".parse::<GridKey>(), Ok(GridKey::DepthChart));
        assert!("schedule".parse::<GridKey>().is_err());
    }

    #[test]
    fn hex_color_validation() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#1A2b3C"));
        assert!(!is_hex_color("fff"));
        assert!(!is_hex_color("#ffff"));
        assert!(!is_hex_color("#ggg"));

        let scheme = TeamColorScheme::new("#000", "#ffffff").with_accent("red");
        assert_eq!(scheme.invalid_color(), Some("red"));
        assert_eq!(TeamColorScheme::new("#000", "#fff").invalid_color(), None);
    }

    #[test]
    fn grid_patch_only_touches_present_fields() {
        let mut grid = GridPreference::with_columns(["name", "age"]);
        grid.sort_column = Some("age".into());

        grid.apply(GridPreferencePatch {
            sort_direction: Some(SortDirection::Desc),
            ..Default::default()
        });

        assert_eq!(grid.columns, vec!["name", "age"]);
        assert_eq!(grid.sort_column.as_deref(), Some("age"));
        assert_eq!(grid.sort_direction, Some(SortDirection::Desc));
    }

    #[test]
    fn row_passes_combines_filters() {
        let mut grid = GridPreference::with_columns(["name", "age", "overall"]);
        grid.numeric_filters
            .insert("overall".into(), NumericFilterValue::new(FilterOperator::Gte, 70.0));
        grid.numeric_filters
            .insert("age".into(), NumericFilterValue::new(FilterOperator::Lt, 30.0));
        grid.position_filter.insert("QB".into());

        let row = |age: f64, overall: f64| {
            move |column: &str| match column {
                "age" => Some(age),
                "overall" => Some(overall),
                _ => None,
            }
        };

        assert!(grid.row_passes(row(24.0, 81.0), Some("QB"), None));
        assert!(!grid.row_passes(row(31.0, 81.0), Some("QB"), None));
        assert!(!grid.row_passes(row(24.0, 60.0), Some("QB"), None));
        assert!(!grid.row_passes(row(24.0, 81.0), Some("WR"), None));
        assert!(!grid.row_passes(|_: &str| None, Some("QB"), None));
    }

    #[test]
    fn team_ids_round_trip_as_json_object_keys() {
        let mut doc_schemes = BTreeMap::new();
        doc_schemes.insert(7u32, TeamColorScheme::new("#123456", "#abcdef"));
        let json = serde_json::to_value(&doc_schemes).unwrap();
        assert_eq!(json["7"]["primary"], "#123456");
        let back: BTreeMap<TeamId, TeamColorScheme> = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc_schemes);
    }
}
