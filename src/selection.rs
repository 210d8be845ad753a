use std::collections::BTreeSet;

/// The three categorical filter axes. Each one backs a checkbox group in the
/// sidebar and a set in [`SelectionState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterCategory {
    Feature,
    Industry,
    Company,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 3] = [
        FilterCategory::Industry,
        FilterCategory::Feature,
        FilterCategory::Company,
    ];

    pub fn title(self) -> &'static str {
        match self {
            FilterCategory::Feature => "Features",
            FilterCategory::Industry => "Industries",
            FilterCategory::Company => "Companies",
        }
    }
}

/// State of a category's select-all master control at the moment a change is
/// applied. `Default` is only used while options are first registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectAllState {
    Default,
    On,
    Off,
}

impl SelectAllState {
    pub fn from_checked(checked: bool) -> Self {
        if checked {
            SelectAllState::On
        } else {
            SelectAllState::Off
        }
    }
}

/// Live checked state of a category's checkbox group. The selection state
/// machine reads through this trait so it can be exercised without any UI.
pub trait OptionStates {
    /// Checked flag for a single option value.
    fn is_checked(&self, value: &str) -> bool;
    /// Values of every currently checked option, in display order.
    fn checked_values(&self) -> Vec<String>;
}

/// The selections a query is built from. One instance lives for the whole
/// session, owned by the app and mutated only from input handlers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub features: BTreeSet<String>,
    pub industries: BTreeSet<String>,
    pub companies: BTreeSet<String>,
    pub date1: String,
    pub date2: String,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, category: FilterCategory) -> &BTreeSet<String> {
        match category {
            FilterCategory::Feature => &self.features,
            FilterCategory::Industry => &self.industries,
            FilterCategory::Company => &self.companies,
        }
    }

    fn set_mut(&mut self, category: FilterCategory) -> &mut BTreeSet<String> {
        match category {
            FilterCategory::Feature => &mut self.features,
            FilterCategory::Industry => &mut self.industries,
            FilterCategory::Company => &mut self.companies,
        }
    }

    /// Apply one selection change. `value` is either a real option value or
    /// one of the sentinels `"all"` / `"none"` emitted by the master control.
    ///
    /// Branches:
    /// - `Default`: unconditional insert, used only while options are being
    ///   registered at startup.
    /// - `On` + `"all"`: clear, then resync from the checkbox group — "all"
    ///   means "take whatever is checked right now", not a literal option.
    /// - `Off` + `"none"`: clear.
    /// - anything else: a single option changed; its membership follows the
    ///   option's actual checked flag.
    pub fn apply_change(
        &mut self,
        category: FilterCategory,
        value: &str,
        state: SelectAllState,
        options: &dyn OptionStates,
    ) {
        let value = value.trim();
        let set = self.set_mut(category);

        match state {
            SelectAllState::Default => {
                set.insert(value.to_string());
            }
            SelectAllState::On if value == "all" => {
                set.clear();
                set.extend(options.checked_values());
            }
            SelectAllState::Off if value == "none" => {
                set.clear();
            }
            _ => {
                if options.is_checked(value) {
                    set.insert(value.to_string());
                } else {
                    set.remove(value);
                }
            }
        }
    }
}
