use crate::calc::{METRIC_COUNT, Metric};

/// A display cell inside the current window: style row group, metric row, week column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CellCoord {
    pub style: usize,
    pub metric: usize,
    pub week_col: usize,
}

impl CellCoord {
    pub fn new(style: usize, metric: usize, week_col: usize) -> Self {
        CellCoord { style, metric, week_col }
    }

    /// Flat grid row (style × metric).
    fn row(self) -> usize {
        self.style * METRIC_COUNT + self.metric
    }

    fn from_row(row: usize, week_col: usize) -> Self {
        CellCoord { style: row / METRIC_COUNT, metric: row % METRIC_COUNT, week_col }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum CellState {
    #[default]
    Idle,
    Selected(CellCoord),
    Editing { coord: CellCoord, draft: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

/// Size of the navigable grid: every style's metric rows by the visible week columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBounds {
    pub styles: usize,
    pub cols: usize,
}

impl GridBounds {
    fn rows(self) -> usize {
        self.styles * METRIC_COUNT
    }

    fn is_empty(self) -> bool {
        self.styles == 0 || self.cols == 0
    }

    fn contains(self, coord: CellCoord) -> bool {
        coord.style < self.styles && coord.metric < METRIC_COUNT && coord.week_col < self.cols
    }
}

/// Only present and future weeks of editable metrics accept edits.
pub fn is_cell_editable(metric: Metric, week: u32, current_week: u32) -> bool {
    metric.is_editable() && week >= current_week
}

/// Selection, in-place editing and the copy slot for the grid.
#[derive(Debug, Default)]
pub struct EditController {
    state: CellState,
    /// Last selected position, restored when navigation resumes from Idle.
    anchor: Option<CellCoord>,
    clipboard: Option<String>,
}

impl EditController {
    pub fn state(&self) -> &CellState {
        &self.state
    }

    pub fn selected(&self) -> Option<CellCoord> {
        match &self.state {
            CellState::Idle => None,
            CellState::Selected(c) => Some(*c),
            CellState::Editing { coord, .. } => Some(*coord),
        }
    }

    pub fn editing(&self) -> Option<(CellCoord, &str)> {
        match &self.state {
            CellState::Editing { coord, draft } => Some((*coord, draft.as_str())),
            _ => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, CellState::Editing { .. })
    }

    pub fn select(&mut self, coord: CellCoord) {
        self.state = CellState::Selected(coord);
        self.anchor = Some(coord);
    }

    pub fn clear(&mut self) {
        self.state = CellState::Idle;
    }

    /// Selected -> Editing, seeding the draft. Refused when the cell is locked.
    pub fn begin_edit(&mut self, seed: String, editable: bool) -> bool {
        match self.state {
            CellState::Selected(coord) if editable => {
                self.state = CellState::Editing { coord, draft: seed };
                true
            }
            _ => false,
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let CellState::Editing { draft, .. } = &mut self.state {
            if c.is_ascii_digit() || (c == '-' && draft.is_empty()) {
                draft.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let CellState::Editing { draft, .. } = &mut self.state {
            draft.pop();
        }
    }

    pub fn clear_draft(&mut self) {
        if let CellState::Editing { draft, .. } = &mut self.state {
            draft.clear();
        }
    }

    /// Editing -> Idle. Yields the parsed value; a non-numeric draft is dropped silently.
    pub fn finish(&mut self) -> Option<(CellCoord, i64)> {
        if !self.is_editing() {
            return None;
        }
        let CellState::Editing { coord, draft } = std::mem::take(&mut self.state) else {
            return None;
        };
        self.anchor = Some(coord);
        draft.trim().parse::<i64>().ok().map(|v| (coord, v))
    }

    /// Editing -> Idle without producing a value.
    pub fn cancel(&mut self) {
        if let CellState::Editing { coord, .. } = self.state {
            self.anchor = Some(coord);
            self.state = CellState::Idle;
        }
    }

    /// Moves the selection one cell, wrapping between rows at the left/right edges.
    /// From Idle the last anchor (or the first cell) becomes selected instead.
    pub fn navigate(&mut self, mv: Move, bounds: GridBounds) -> bool {
        if bounds.is_empty() {
            return false;
        }
        let current = match self.state {
            CellState::Selected(c) => c,
            CellState::Idle => {
                let start = self
                    .anchor
                    .filter(|a| bounds.contains(*a))
                    .unwrap_or_default();
                self.select(start);
                return true;
            }
            CellState::Editing { .. } => return false,
        };

        let row = current.row();
        let col = current.week_col;
        let next = match mv {
            Move::Right if col + 1 < bounds.cols => Some(CellCoord::from_row(row, col + 1)),
            Move::Right if row + 1 < bounds.rows() => Some(CellCoord::from_row(row + 1, 0)),
            Move::Left if col > 0 => Some(CellCoord::from_row(row, col - 1)),
            Move::Left if row > 0 => Some(CellCoord::from_row(row - 1, bounds.cols - 1)),
            Move::Down if row + 1 < bounds.rows() => Some(CellCoord::from_row(row + 1, col)),
            Move::Up if row > 0 => Some(CellCoord::from_row(row - 1, col)),
            _ => None,
        };
        match next {
            Some(coord) => {
                self.select(coord);
                true
            }
            None => false,
        }
    }

    /// Pulls the selection back inside `bounds` after the window or data changed.
    pub fn clamp(&mut self, bounds: GridBounds) {
        let fit = |c: CellCoord| CellCoord {
            style: c.style.min(bounds.styles.saturating_sub(1)),
            metric: c.metric,
            week_col: c.week_col.min(bounds.cols.saturating_sub(1)),
        };
        if bounds.is_empty() {
            self.state = CellState::Idle;
            self.anchor = None;
            return;
        }
        match &mut self.state {
            CellState::Selected(c) => *c = fit(*c),
            CellState::Editing { coord, .. } => *coord = fit(*coord),
            CellState::Idle => {}
        }
        self.anchor = self.anchor.map(fit);
    }

    pub fn copy(&mut self, value: String) {
        self.clipboard = Some(value);
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: GridBounds = GridBounds { styles: 2, cols: 3 };

    fn selected_at(coord: CellCoord) -> EditController {
        let mut ec = EditController::default();
        ec.select(coord);
        ec
    }

    #[test]
    fn test_initial_state_is_idle() {
        let ec = EditController::default();
        assert_eq!(ec.state(), &CellState::Idle);
        assert_eq!(ec.selected(), None);
    }

    #[test]
    fn test_begin_edit_requires_selection_and_editability() {
        let mut ec = EditController::default();
        assert!(!ec.begin_edit("5".into(), true));
        ec.select(CellCoord::new(0, 0, 0));
        assert!(!ec.begin_edit("5".into(), false));
        assert_eq!(ec.state(), &CellState::Selected(CellCoord::new(0, 0, 0)));
        assert!(ec.begin_edit("5".into(), true));
        assert_eq!(ec.editing(), Some((CellCoord::new(0, 0, 0), "5")));
    }

    #[test]
    fn test_finish_parses_and_returns_to_idle() {
        let mut ec = selected_at(CellCoord::new(1, 5, 2));
        ec.begin_edit("4".into(), true);
        ec.push_char('2');
        assert_eq!(ec.finish(), Some((CellCoord::new(1, 5, 2), 42)));
        assert_eq!(ec.state(), &CellState::Idle);
    }

    #[test]
    fn test_finish_non_numeric_is_silently_dropped() {
        let mut ec = selected_at(CellCoord::new(0, 0, 0));
        ec.begin_edit("-".into(), true);
        assert_eq!(ec.finish(), None);
        assert_eq!(ec.state(), &CellState::Idle);
    }

    #[test]
    fn test_push_char_filters_input() {
        let mut ec = selected_at(CellCoord::new(0, 0, 0));
        ec.begin_edit(String::new(), true);
        for c in ['-', '1', 'x', '-', '0', '.'] {
            ec.push_char(c);
        }
        assert_eq!(ec.editing().unwrap().1, "-10");
        ec.backspace();
        assert_eq!(ec.editing().unwrap().1, "-1");
        assert_eq!(ec.finish().unwrap().1, -1);
    }

    #[test]
    fn test_cancel_discards_draft() {
        let mut ec = selected_at(CellCoord::new(0, 0, 1));
        ec.begin_edit("7".into(), true);
        ec.cancel();
        assert_eq!(ec.state(), &CellState::Idle);
        assert_eq!(ec.finish(), None);
    }

    #[test]
    fn test_navigate_from_idle_selects_anchor() {
        let mut ec = EditController::default();
        assert!(ec.navigate(Move::Right, BOUNDS));
        assert_eq!(ec.selected(), Some(CellCoord::new(0, 0, 0)));

        let mut ec = selected_at(CellCoord::new(1, 2, 1));
        ec.begin_edit("1".into(), true);
        ec.cancel();
        ec.navigate(Move::Down, BOUNDS);
        assert_eq!(ec.selected(), Some(CellCoord::new(1, 2, 1)));
    }

    #[test]
    fn test_navigate_right_wraps_to_next_row() {
        let mut ec = selected_at(CellCoord::new(0, 0, 2));
        assert!(ec.navigate(Move::Right, BOUNDS));
        assert_eq!(ec.selected(), Some(CellCoord::new(0, 1, 0)));

        let mut ec = selected_at(CellCoord::new(0, METRIC_COUNT - 1, 2));
        ec.navigate(Move::Right, BOUNDS);
        assert_eq!(ec.selected(), Some(CellCoord::new(1, 0, 0)));
    }

    #[test]
    fn test_navigate_left_wraps_to_previous_row() {
        let mut ec = selected_at(CellCoord::new(1, 0, 0));
        ec.navigate(Move::Left, BOUNDS);
        assert_eq!(ec.selected(), Some(CellCoord::new(0, METRIC_COUNT - 1, 2)));
    }

    #[test]
    fn test_navigate_past_first_and_last_cell_is_noop() {
        let first = CellCoord::new(0, 0, 0);
        let mut ec = selected_at(first);
        assert!(!ec.navigate(Move::Left, BOUNDS));
        assert!(!ec.navigate(Move::Up, BOUNDS));
        assert_eq!(ec.selected(), Some(first));

        let last = CellCoord::new(1, METRIC_COUNT - 1, 2);
        let mut ec = selected_at(last);
        assert!(!ec.navigate(Move::Right, BOUNDS));
        assert!(!ec.navigate(Move::Down, BOUNDS));
        assert_eq!(ec.selected(), Some(last));
    }

    #[test]
    fn test_navigate_down_crosses_style_boundary() {
        let mut ec = selected_at(CellCoord::new(0, METRIC_COUNT - 1, 1));
        ec.navigate(Move::Down, BOUNDS);
        assert_eq!(ec.selected(), Some(CellCoord::new(1, 0, 1)));
    }

    #[test]
    fn test_navigate_while_editing_is_refused() {
        let mut ec = selected_at(CellCoord::new(0, 0, 0));
        ec.begin_edit("1".into(), true);
        assert!(!ec.navigate(Move::Right, BOUNDS));
        assert!(ec.is_editing());
    }

    #[test]
    fn test_navigate_on_empty_grid() {
        let mut ec = EditController::default();
        assert!(!ec.navigate(Move::Right, GridBounds { styles: 0, cols: 10 }));
        assert_eq!(ec.state(), &CellState::Idle);
    }

    #[test]
    fn test_clamp_pulls_selection_inside() {
        let mut ec = selected_at(CellCoord::new(5, 3, 9));
        ec.clamp(BOUNDS);
        assert_eq!(ec.selected(), Some(CellCoord::new(1, 3, 2)));
        ec.clamp(GridBounds { styles: 0, cols: 0 });
        assert_eq!(ec.state(), &CellState::Idle);
    }

    #[test]
    fn test_copy_slot() {
        let mut ec = EditController::default();
        assert_eq!(ec.clipboard(), None);
        ec.copy("85".into());
        assert_eq!(ec.clipboard(), Some("85"));
    }

    #[test]
    fn test_editability_boundary() {
        assert!(!is_cell_editable(Metric::SalesQty, 40, 41));
        assert!(!is_cell_editable(Metric::Otb, 0, 41));
        assert!(is_cell_editable(Metric::SalesQty, 41, 41));
        assert!(is_cell_editable(Metric::Otb, 60, 41));
        assert!(!is_cell_editable(Metric::WhInvQty, 60, 41));
        assert!(!is_cell_editable(Metric::StoreWks, 41, 41));
    }
}
