use crate::selection::SelectedPath;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Overview,
    Entities,
    Relationships,
    Versions,
    Annotations,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Self::Overview,
        Self::Entities,
        Self::Relationships,
        Self::Versions,
        Self::Annotations,
        Self::Settings,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Entities => "Entities",
            Self::Relationships => "Relationships",
            Self::Versions => "Versions",
            Self::Annotations => "Annotations",
            Self::Settings => "Settings",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a screen needs from the shell, handed down explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewContext {
    pub selected_path: SelectedPath,
    pub darkmode: bool,
}

/// Top-level state: active tab, current selection, theme.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    active_tab: Tab,
    selected_path: SelectedPath,
    darkmode: bool,
}

impl Shell {
    pub fn new(darkmode: bool) -> Self {
        Self {
            darkmode,
            ..Self::default()
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn selected_path(&self) -> &SelectedPath {
        &self.selected_path
    }

    /// For the filter bar and canvas, which edit the path in place.
    pub fn selected_path_mut(&mut self) -> &mut SelectedPath {
        &mut self.selected_path
    }

    /// A new selection from the filter or search bar: store it and jump to
    /// the overview tab.
    pub fn handle_selection(&mut self, path: SelectedPath) {
        self.selected_path = path;
        self.active_tab = Tab::Overview;
    }

    pub fn darkmode(&self) -> bool {
        self.darkmode
    }

    pub fn toggle_darkmode(&mut self) -> bool {
        self.darkmode = !self.darkmode;
        self.darkmode
    }

    pub fn context(&self) -> ViewContext {
        ViewContext {
            selected_path: self.selected_path.clone(),
            darkmode: self.darkmode,
        }
    }
}
