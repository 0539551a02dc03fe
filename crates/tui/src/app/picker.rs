use super::catalog::{filter_models, group_by_provider, ModelCatalog};

/// Model-selection overlay. Present only while the overlay is open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickerState {
    pub searching: bool,
    pub query: String,
    pub filtered: Vec<String>,
    pub selected: usize,
}

impl PickerState {
    /// Unfiltered snapshot with the cursor on `current` when it is listed.
    pub fn open(catalog: &ModelCatalog, current: &str) -> Self {
        Self {
            searching: false,
            query: String::new(),
            filtered: catalog.ids().to_vec(),
            selected: catalog.position(current).unwrap_or(0),
        }
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.filtered.get(self.selected).map(String::as_str)
    }

    pub fn enter_search(&mut self, catalog: &ModelCatalog) {
        self.searching = true;
        self.refilter(catalog);
    }

    pub fn leave_search(&mut self, catalog: &ModelCatalog) {
        self.searching = false;
        self.refilter(catalog);
    }

    pub fn push_char(&mut self, ch: char, catalog: &ModelCatalog) {
        self.query.push(ch);
        self.filtered = filter_models(catalog.ids(), &self.query);
        self.selected = 0;
    }

    pub fn pop_char(&mut self, catalog: &ModelCatalog) {
        if self.query.pop().is_some() {
            self.refilter(catalog);
        }
    }

    /// Re-derives `filtered` from the catalog and the current query.
    pub fn refilter(&mut self, catalog: &ModelCatalog) {
        self.filtered = filter_models(catalog.ids(), &self.query);
        self.clamp();
    }

    /// Like `refilter`, but the cursor follows the highlighted id when it is
    /// still listed. Used when the catalog itself changes underneath.
    pub fn refilter_following(&mut self, catalog: &ModelCatalog) {
        let keep = self.highlighted().map(str::to_string);
        self.refilter(catalog);
        if let Some(pos) = keep.and_then(|id| self.filtered.iter().position(|m| *m == id)) {
            self.selected = pos;
        }
    }

    /// Steps through the list in the order the overlay shows it: catalog
    /// order while searching, provider groups otherwise.
    pub fn move_by(&mut self, delta: isize) {
        if self.filtered.is_empty() {
            self.selected = 0;
            return;
        }
        let order = self.display_order();
        let at = order.iter().position(|i| *i == self.selected).unwrap_or(0);
        let last = order.len() as isize - 1;
        let target = (at as isize + delta).clamp(0, last) as usize;
        self.selected = order[target];
    }

    /// Indices into `filtered`, listed top to bottom as displayed.
    fn display_order(&self) -> Vec<usize> {
        if !self.query.is_empty() {
            return (0..self.filtered.len()).collect();
        }
        group_by_provider(&self.filtered)
            .iter()
            .flat_map(|g| g.models.iter())
            .filter_map(|id| self.filtered.iter().position(|m| m.as_str() == *id))
            .collect()
    }

    fn clamp(&mut self) {
        self.selected = self.selected.min(self.filtered.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModelCatalog {
        ModelCatalog::from_ids([
            "anthropic/claude-3.7-sonnet",
            "openai/gpt-4o",
            "openai/gpt-3.5-turbo",
            "anthropic/claude-3-haiku",
        ])
    }

    #[test]
    fn opens_on_current_model() {
        let c = catalog();
        let p = PickerState::open(&c, "openai/gpt-3.5-turbo");
        assert_eq!(p.selected, 2);
        assert_eq!(p.filtered, c.ids().to_vec());
        assert_eq!(PickerState::open(&c, "missing/model").selected, 0);
    }

    #[test]
    fn typing_resets_cursor_and_backspace_clamps() {
        let c = catalog();
        let mut p = PickerState::open(&c, "anthropic/claude-3-haiku");
        p.enter_search(&c);
        for ch in "gpt".chars() {
            p.push_char(ch, &c);
        }
        assert_eq!(p.selected, 0);
        assert_eq!(p.filtered.len(), 2);
        p.move_by(1);
        p.push_char('z', &c);
        assert!(p.filtered.is_empty());
        assert_eq!(p.selected, 0);
        p.pop_char(&c);
        assert_eq!(p.query, "gpt");
        assert!(p.selected < p.filtered.len());
    }

    #[test]
    fn backspace_on_empty_query_is_a_noop() {
        let c = catalog();
        let mut p = PickerState::open(&c, "openai/gpt-4o");
        p.enter_search(&c);
        let before = p.clone();
        p.pop_char(&c);
        assert_eq!(p, before);
    }

    #[test]
    fn movement_is_clamped() {
        let c = catalog();
        let mut p = PickerState::open(&c, "anthropic/claude-3.7-sonnet");
        p.move_by(-1);
        assert_eq!(p.selected, 0);
        p.move_by(10);
        assert_eq!(p.highlighted(), Some("openai/gpt-3.5-turbo"));
        p.move_by(1);
        assert_eq!(p.highlighted(), Some("openai/gpt-3.5-turbo"));
        p.move_by(-10);
        assert_eq!(p.selected, 0);
    }

    #[test]
    fn grouped_list_moves_in_display_order() {
        let c = catalog();
        let mut p = PickerState::open(&c, "anthropic/claude-3.7-sonnet");
        let mut seen = vec![p.highlighted().unwrap().to_string()];
        for _ in 0..3 {
            p.move_by(1);
            seen.push(p.highlighted().unwrap().to_string());
        }
        assert_eq!(
            seen,
            [
                "anthropic/claude-3.7-sonnet",
                "anthropic/claude-3-haiku",
                "openai/gpt-4o",
                "openai/gpt-3.5-turbo",
            ]
        );
        p.move_by(-2);
        assert_eq!(p.highlighted(), Some("anthropic/claude-3-haiku"));
        // Filtering keeps catalog order.
        assert_eq!(p.filtered, c.ids().to_vec());
    }

    #[test]
    fn search_results_move_in_catalog_order() {
        let c = catalog();
        let mut p = PickerState::open(&c, "anthropic/claude-3.7-sonnet");
        p.enter_search(&c);
        p.push_char('o', &c);
        p.move_by(1);
        assert_eq!(p.highlighted(), Some("openai/gpt-4o"));
    }

    #[test]
    fn catalog_change_keeps_the_highlighted_id() {
        let c = catalog();
        let mut p = PickerState::open(&c, "anthropic/claude-3-haiku");
        let fresh = ModelCatalog::from_ids(["anthropic/claude-3-haiku", "openai/gpt-4o"]);
        p.refilter_following(&fresh);
        assert_eq!(p.highlighted(), Some("anthropic/claude-3-haiku"));
        assert_eq!(p.selected, 0);

        let mut p = PickerState::open(&c, "anthropic/claude-3-haiku");
        p.refilter_following(&ModelCatalog::from_ids(["x/1"]));
        assert_eq!(p.selected, 0);
    }
}
