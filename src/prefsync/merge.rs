//! Merge-with-defaults.
//!
//! Servers store whatever was last written, which may be an older, partial or
//! empty document. Before anything reads preferences, the raw document is
//! folded over the hardcoded defaults two levels deep:
//!
//! ```text
//! document -> section (ui, teamColorSchemes, grids.<key>) -> field
//! ```
//!
//! A field present in the raw document wins over the default at the same
//! level; everything else keeps its default. Supplying `grids.roster` with
//! only `sortColumn` keeps the default `grids.roster.columns`, and supplying
//! only `grids.roster` still yields a default `grids.depthChart`.
//!
//! `null` is treated as absent, never as a deletion. Unknown grid keys and
//! malformed fields are skipped with a warning rather than failing the load.

use crate::error::{PrefsError, Result};
use crate::filter::NumericFilterValue;
use crate::model::{
    GridKey, GridPreferencePatch, PreferenceDocument, SortDirection, TeamColorScheme, TeamId,
    Theme,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// A raw server document decoded section by section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialPreferences {
    pub theme: Option<Theme>,
    pub team_color_schemes: BTreeMap<TeamId, TeamColorScheme>,
    pub grids: BTreeMap<GridKey, GridPreferencePatch>,
}

impl PartialPreferences {
    /// Decodes a raw document. `null` decodes to an empty document; any other
    /// non-object is rejected.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let root = match raw {
            Value::Null => return Ok(Self::default()),
            Value::Object(root) => root,
            other => {
                return Err(PrefsError::Load(format!(
                    "expected a preferences object, got {}",
                    json_kind(other)
                )))
            }
        };

        let mut partial = Self::default();

        if let Some(ui) = section(root, "ui") {
            partial.theme = field(ui, "theme", "ui");
        }

        if let Some(schemes) = section(root, "teamColorSchemes") {
            for (key, value) in schemes {
                let Ok(team) = key.parse::<TeamId>() else {
                    warn!(team = %key, "ignoring color scheme for non-numeric team id");
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                match serde_json::from_value::<TeamColorScheme>(value.clone()) {
                    Ok(scheme) => {
                        partial.team_color_schemes.insert(team, scheme);
                    }
                    Err(err) => warn!(team, error = %err, "ignoring malformed color scheme"),
                }
            }
        }

        if let Some(grids) = section(root, "grids") {
            for (key, value) in grids {
                let Some(grid) = GridKey::ALL.into_iter().find(|g| g.as_str() == key) else {
                    warn!(grid = %key, "ignoring preferences for unknown grid");
                    continue;
                };
                let Value::Object(fields) = value else {
                    continue;
                };
                partial.grids.insert(grid, grid_patch(fields, key));
            }
        }

        Ok(partial)
    }
}

fn grid_patch(fields: &Map<String, Value>, grid: &str) -> GridPreferencePatch {
    GridPreferencePatch {
        columns: field::<Vec<String>>(fields, "columns", grid),
        column_widths: field::<BTreeMap<String, u32>>(fields, "columnWidths", grid),
        sort_column: field::<String>(fields, "sortColumn", grid),
        sort_direction: field::<SortDirection>(fields, "sortDirection", grid),
        numeric_filters: field::<BTreeMap<String, NumericFilterValue>>(
            fields,
            "numericFilters",
            grid,
        ),
        position_filter: field::<BTreeSet<String>>(fields, "positionFilter", grid),
        status_filter: field::<BTreeSet<String>>(fields, "statusFilter", grid),
    }
}

fn section<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    match root.get(key)? {
        Value::Object(map) => Some(map),
        Value::Null => None,
        other => {
            warn!(section = key, kind = json_kind(other), "ignoring non-object section");
            None
        }
    }
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, key: &str, context: &str) -> Option<T> {
    let value = map.get(key).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(section = context, field = key, error = %err, "ignoring malformed field");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Folds `partial` over `defaults`, producing a complete document.
pub fn merge_with_defaults(
    partial: PartialPreferences,
    defaults: &PreferenceDocument,
) -> PreferenceDocument {
    let mut doc = defaults.clone();
    if let Some(theme) = partial.theme {
        doc.ui.theme = theme;
    }
    doc.team_color_schemes.extend(partial.team_color_schemes);
    for (key, patch) in partial.grids {
        doc.grids.get_mut(key).apply(patch);
    }
    doc
}

/// Decodes and merges a raw document in one step.
pub fn merge_value(raw: &Value, defaults: &PreferenceDocument) -> Result<PreferenceDocument> {
    Ok(merge_with_defaults(PartialPreferences::from_value(raw)?, defaults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{default_preferences, DEFAULT_PREFERENCES};
    use crate::filter::FilterOperator;
    use serde_json::json;

    fn merged(raw: Value) -> PreferenceDocument {
        merge_value(&raw, &DEFAULT_PREFERENCES).unwrap()
    }

    #[test]
    fn theme_only_document_keeps_default_grids() {
        let doc = merged(json!({ "ui": { "theme": "dark" } }));
        assert_eq!(doc.theme(), Theme::Dark);
        assert_eq!(doc.grids, DEFAULT_PREFERENCES.grids);
        assert!(!doc.grid(GridKey::Roster).columns.is_empty());
    }

    #[test]
    fn empty_and_null_documents_are_defaults() {
        assert_eq!(merged(json!({})), default_preferences());
        assert_eq!(merged(Value::Null), default_preferences());
    }

    #[test]
    fn grid_fields_merge_one_level_deep() {
        let doc = merged(json!({
            "grids": { "roster": { "sortColumn": "age", "sortDirection": "asc" } }
        }));
        let roster = doc.grid(GridKey::Roster);
        assert_eq!(roster.sort_column.as_deref(), Some("age"));
        assert_eq!(roster.sort_direction, Some(SortDirection::Asc));
        assert_eq!(roster.columns, DEFAULT_PREFERENCES.grid(GridKey::Roster).columns);
        assert_eq!(doc.grid(GridKey::DepthChart), DEFAULT_PREFERENCES.grid(GridKey::DepthChart));
    }

    #[test]
    fn stored_columns_replace_default_columns() {
        let doc = merged(json!({ "grids": { "standings": { "columns": ["team", "streak"] } } }));
        let standings = doc.grid(GridKey::Standings);
        assert_eq!(standings.columns, vec!["team", "streak"]);
        assert_eq!(standings.sort_column.as_deref(), Some("winPct"));
    }

    #[test]
    fn filters_and_team_colors_are_decoded() {
        let doc = merged(json!({
            "teamColorSchemes": {
                "4": { "primary": "#002244", "secondary": "#c60c30" },
                "9": null
            },
            "grids": {
                "rosterOffense": {
                    "numericFilters": { "overall": { "operator": ">=", "value": 75 } },
                    "positionFilter": ["QB", "WR"]
                }
            }
        }));
        assert_eq!(doc.team_color_schemes.len(), 1);
        assert_eq!(doc.team_color_scheme(4).unwrap().secondary, "#c60c30");
        let offense = doc.grid(GridKey::RosterOffense);
        assert_eq!(
            offense.numeric_filters.get("overall"),
            Some(&NumericFilterValue::new(FilterOperator::Gte, 75.0))
        );
        assert!(offense.position_filter.contains("WR"));
    }

    #[test]
    fn unknown_and_malformed_entries_are_skipped() {
        let doc = merged(json!({
            "ui": { "theme": "sepia" },
            "teamColorSchemes": { "bears": { "primary": "#000", "secondary": "#fff" } },
            "grids": {
                "schedule": { "columns": ["week"] },
                "roster": { "columns": "name,age", "sortColumn": "name" }
            }
        }));
        assert_eq!(doc.theme(), Theme::System);
        assert!(doc.team_color_schemes.is_empty());
        let roster = doc.grid(GridKey::Roster);
        assert_eq!(roster.columns, DEFAULT_PREFERENCES.grid(GridKey::Roster).columns);
        assert_eq!(roster.sort_column.as_deref(), Some("name"));
    }

    #[test]
    fn null_fields_do_not_erase_defaults() {
        let doc = merged(json!({ "grids": { "standings": { "sortColumn": null, "columns": null } } }));
        assert_eq!(doc.grid(GridKey::Standings), DEFAULT_PREFERENCES.grid(GridKey::Standings));
    }

    #[test]
    fn non_object_document_is_a_load_error() {
        let err = PartialPreferences::from_value(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, PrefsError::Load(_)));
    }

    #[test]
    fn full_document_survives_a_merge_unchanged() {
        let mut doc = default_preferences();
        doc.ui.theme = Theme::Light;
        doc.team_color_schemes
            .insert(1, TeamColorScheme::new("#111", "#222").with_accent("#333"));
        doc.grids.roster.columns = vec!["overall".into(), "name".into()];
        doc.grids.roster.column_widths.insert("name".into(), 180);

        let raw = serde_json::to_value(&doc).unwrap();
        assert_eq!(merge_value(&raw, &DEFAULT_PREFERENCES).unwrap(), doc);
    }
}
