//! Selection summary panel: visibility of the selected-articles drawer.

/// How the panel is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelVisibility {
    /// Nothing selected.
    Hidden,
    Minimized,
    Expanded,
}

#[derive(Debug, Clone)]
pub struct SelectionPanel {
    visibility: PanelVisibility,
}

impl Default for SelectionPanel {
    fn default() -> Self {
        Self {
            visibility: PanelVisibility::Hidden,
        }
    }
}

impl SelectionPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visibility(&self) -> PanelVisibility {
        self.visibility
    }

    /// Follow the selection size: hide when empty, expand when the first article arrives.
    pub fn sync(&mut self, selected: usize) {
        self.visibility = match (selected, self.visibility) {
            (0, _) => PanelVisibility::Hidden,
            (_, PanelVisibility::Hidden) => PanelVisibility::Expanded,
            (_, current) => current,
        };
    }

    /// A click on the minimized panel opens it.
    pub fn on_click(&mut self) {
        if self.visibility == PanelVisibility::Minimized {
            self.visibility = PanelVisibility::Expanded;
        }
    }

    /// Pointer left the panel.
    pub fn on_leave(&mut self) {
        if self.visibility == PanelVisibility::Expanded {
            self.visibility = PanelVisibility::Minimized;
        }
    }

    /// Open the panel from outside, e.g. after a checkbox toggle on an article card.
    pub fn force_expand(&mut self, selected: usize) {
        self.visibility = if selected == 0 {
            PanelVisibility::Hidden
        } else {
            PanelVisibility::Expanded
        };
    }

    /// Merge and clear are disabled on an empty selection.
    pub fn actions_enabled(selected: usize) -> bool {
        selected > 0
    }
}
