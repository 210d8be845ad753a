use std::collections::BTreeMap;

use crate::selection::{FilterCategory, OptionStates, SelectAllState, SelectionState};

/// One checkbox row in a filter panel.
#[derive(Clone, Debug)]
pub struct FilterOption {
    pub value: String,
    /// Occurrence count from the backend facet summary, when it reported one.
    pub count: Option<u64>,
    pub checked: bool,
}

/// A category's checkbox group: the options plus the select-all master
/// control. This is the live source of truth the selection state machine
/// resyncs from.
#[derive(Clone, Debug)]
pub struct FilterPanel {
    pub category: FilterCategory,
    pub options: Vec<FilterOption>,
    pub select_all: bool,
}

impl OptionStates for FilterPanel {
    fn is_checked(&self, value: &str) -> bool {
        self.options
            .iter()
            .any(|opt| opt.value == value && opt.checked)
    }

    fn checked_values(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|opt| opt.checked)
            .map(|opt| opt.value.clone())
            .collect()
    }
}

impl FilterPanel {
    /// Build a panel from a backend facet summary and seed the selection set.
    /// Every option starts checked and selected (the "default" mode).
    pub fn register_options(
        category: FilterCategory,
        counts: &BTreeMap<String, u64>,
        selections: &mut SelectionState,
    ) -> Self {
        let panel = Self {
            category,
            options: counts
                .iter()
                .map(|(value, &count)| FilterOption {
                    value: value.clone(),
                    count: Some(count),
                    checked: true,
                })
                .collect(),
            select_all: true,
        };

        for opt in &panel.options {
            selections.apply_change(category, &opt.value, SelectAllState::Default, &panel);
        }
        panel
    }

    /// Flip a single option's checkbox and push the change into `selections`.
    /// Unchecking any option also unchecks the master, since the set is no
    /// longer complete; checking one never re-checks it.
    pub fn toggle_option(&mut self, index: usize, selections: &mut SelectionState) {
        let Some(opt) = self.options.get_mut(index) else {
            return;
        };
        opt.checked = !opt.checked;
        let value = opt.value.clone();
        if !opt.checked {
            self.select_all = false;
        }

        let state = SelectAllState::from_checked(self.select_all);
        selections.apply_change(self.category, &value, state, self);
    }

    /// Master control toggle: force every checkbox to `turn_on`, then apply
    /// the matching sentinel change.
    pub fn set_all(&mut self, turn_on: bool, selections: &mut SelectionState) {
        for opt in &mut self.options {
            opt.checked = turn_on;
        }
        self.select_all = turn_on;

        let sentinel = if turn_on { "all" } else { "none" };
        let state = SelectAllState::from_checked(turn_on);
        selections.apply_change(self.category, sentinel, state, self);
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn industry_panel(selections: &mut SelectionState) -> FilterPanel {
        FilterPanel::register_options(
            FilterCategory::Industry,
            &counts(&[("Finance", 3), ("Tech", 5)]),
            selections,
        )
    }

    #[test]
    fn register_selects_every_option() {
        let mut selections = SelectionState::new();
        let panel = industry_panel(&mut selections);

        assert!(panel.select_all);
        assert!(panel.options.iter().all(|o| o.checked));
        let got: Vec<&str> = selections.industries.iter().map(|s| s.as_str()).collect();
        assert_eq!(got, vec!["Finance", "Tech"]);
    }

    #[test]
    fn toggle_off_unchecks_master_and_removes() {
        let mut selections = SelectionState::new();
        let mut panel = industry_panel(&mut selections);

        panel.toggle_option(0, &mut selections); // Finance off
        assert!(!panel.select_all);
        assert!(!panel.options[0].checked);
        let got: Vec<&str> = selections.industries.iter().map(|s| s.as_str()).collect();
        assert_eq!(got, vec!["Tech"]);
    }

    #[test]
    fn toggle_round_trip_restores_selection() {
        let mut selections = SelectionState::new();
        let mut panel = industry_panel(&mut selections);
        let original = selections.clone();

        panel.toggle_option(1, &mut selections);
        panel.toggle_option(1, &mut selections);
        assert_eq!(selections, original);
    }

    #[test]
    fn select_all_is_idempotent() {
        let mut selections = SelectionState::new();
        let mut panel = industry_panel(&mut selections);

        panel.toggle_option(0, &mut selections);
        panel.set_all(true, &mut selections);
        let once = selections.clone();
        panel.set_all(true, &mut selections);
        assert_eq!(selections, once);
        assert_eq!(selections.industries.len(), 2);
    }

    #[test]
    fn deselect_all_empties_regardless_of_prior_state() {
        let mut selections = SelectionState::new();
        let mut panel = industry_panel(&mut selections);

        panel.toggle_option(0, &mut selections);
        panel.set_all(false, &mut selections);
        assert!(selections.industries.is_empty());
        assert!(panel.options.iter().all(|o| !o.checked));
    }

    #[test]
    fn selection_always_matches_checked_boxes() {
        let mut selections = SelectionState::new();
        let mut panel = industry_panel(&mut selections);

        panel.toggle_option(0, &mut selections);
        panel.toggle_option(1, &mut selections);
        panel.toggle_option(0, &mut selections);

        let checked: Vec<String> = panel.checked_values();
        let selected: Vec<String> = selections.industries.iter().cloned().collect();
        assert_eq!(checked, selected);
    }
}
