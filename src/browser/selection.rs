use std::collections::BTreeSet;

/// Visible rows marked for a bulk action.
///
/// Row numbers are only meaningful against the projection they were picked
/// from, so the owner clears the set whenever that projection is recomputed.
#[derive(Debug, Default, Clone)]
pub struct SelectionSet {
    rows: BTreeSet<usize>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, row: usize) -> bool {
        self.rows.insert(row)
    }

    pub fn deselect(&mut self, row: usize) -> bool {
        self.rows.remove(&row)
    }

    /// Flips the row and returns its new state.
    pub fn toggle(&mut self, row: usize) -> bool {
        if self.rows.remove(&row) {
            false
        } else {
            self.rows.insert(row);
            true
        }
    }

    pub fn is_selected(&self, row: usize) -> bool {
        self.rows.contains(&row)
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Selected rows in ascending order.
    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_toggle_and_clear() {
        let mut sel = SelectionSet::new();
        assert!(sel.select(3));
        assert!(!sel.select(3));
        assert!(sel.toggle(1));
        assert_eq!(sel.rows().collect::<Vec<_>>(), [1, 3]);
        assert!(!sel.toggle(3));
        assert!(sel.is_selected(1));
        assert!(!sel.is_selected(3));
        assert_eq!(sel.count(), 1);
        assert!(sel.deselect(1));
        assert!(sel.is_empty());
        sel.select(7);
        sel.clear();
        assert_eq!(sel.count(), 0);
    }
}
