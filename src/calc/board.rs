use crate::calc::grouper::{DataWarning, StyleGroup, WeekData, all_week_numbers, group_rows};
use crate::calc::metrics::{Metric, MetricValue, compute};
use crate::calc::week_window::WeekWindow;
use crate::data::{EditField, WeeklyActual};

/// Persisted coordinate of an editable grid cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellTarget {
    pub style_number: String,
    pub week_number: u32,
    pub field: EditField,
}

/// The raw row list plus everything derived from it.
///
/// Rows are the single source of truth. Groups and the week sequence are
/// rebuilt on a full replace and patched in place for single-field edits.
#[derive(Clone, Debug, Default)]
pub struct PlanBoard {
    rows: Vec<WeeklyActual>,
    groups: Vec<StyleGroup>,
    warnings: Vec<DataWarning>,
    weeks: Vec<u32>,
}

impl PlanBoard {
    pub fn from_rows(rows: Vec<WeeklyActual>) -> Self {
        let mut board = PlanBoard::default();
        board.replace_rows(rows);
        board
    }

    pub fn replace_rows(&mut self, rows: Vec<WeeklyActual>) {
        let grouping = group_rows(&rows);
        self.weeks = all_week_numbers(&rows);
        self.groups = grouping.groups;
        self.warnings = grouping.warnings;
        self.rows = rows;
    }

    pub fn rows(&self) -> &[WeeklyActual] {
        &self.rows
    }

    pub fn groups(&self) -> &[StyleGroup] {
        &self.groups
    }

    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }

    /// Every distinct week number across all styles, ascending.
    pub fn weeks(&self) -> &[u32] {
        &self.weeks
    }

    pub fn style_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, style_idx: usize) -> Option<&StyleGroup> {
        self.groups.get(style_idx)
    }

    pub fn find_group(&self, style_number: &str) -> Option<&StyleGroup> {
        self.groups.iter().find(|g| g.style_number == style_number)
    }

    pub fn value(&self, style_idx: usize, metric: Metric, week: u32) -> MetricValue {
        match self.groups.get(style_idx) {
            Some(g) => compute(g, metric, week, &self.weeks),
            None => MetricValue::Placeholder,
        }
    }

    /// Translates a grid position into the (style, week, field) triple it persists to.
    pub fn translate(
        &self,
        style_idx: usize,
        metric_idx: usize,
        week_col: usize,
        window: &WeekWindow,
    ) -> Option<CellTarget> {
        let group = self.groups.get(style_idx)?;
        let field = Metric::from_index(metric_idx)?.edit_field()?;
        let week_number = window.week_at(week_col)?;
        Some(CellTarget { style_number: group.style_number.clone(), week_number, field })
    }

    /// Current raw value behind `target` (`None` for an unset OTB override).
    pub fn raw_value(&self, target: &CellTarget) -> Option<i64> {
        self.find_group(&target.style_number)
            .and_then(|g| g.week(target.week_number))
            .and_then(|w| w.field(target.field))
            .or(match target.field {
                EditField::Otb => None,
                _ => Some(0),
            })
    }

    /// Overwrites one raw field locally in both the row list and its group.
    /// A missing week is created from the style's descriptive attributes.
    /// Weeks before the style's first known week are refused: a new first week
    /// would take over the warehouse baseline seed.
    pub fn apply(&mut self, target: &CellTarget, value: Option<i64>) -> bool {
        let Some(group) = self
            .groups
            .iter_mut()
            .find(|g| g.style_number == target.style_number)
        else {
            return false;
        };
        if group.precedes_first_week(target.week_number) {
            return false;
        }
        group
            .weeks
            .entry(target.week_number)
            .or_insert_with(WeekData::default)
            .set_field(target.field, value);

        match self
            .rows
            .iter_mut()
            .rev()
            .find(|r| r.style_number == target.style_number && r.week_number == target.week_number)
        {
            Some(row) => row.set_field(target.field, value),
            None => {
                if let Some(template) = self
                    .rows
                    .iter()
                    .find(|r| r.style_number == target.style_number)
                {
                    let mut row = WeeklyActual::blank_like(template, target.week_number);
                    row.set_field(target.field, value);
                    self.rows.push(row);
                }
            }
        }
        if let Err(pos) = self.weeks.binary_search(&target.week_number) {
            self.weeks.insert(pos, target.week_number);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(style: &str, week: u32, intake: i64) -> WeeklyActual {
        WeeklyActual {
            style_number: style.to_string(),
            style_name: format!("{style} name"),
            total_plan_qty: 500,
            week_number: week,
            intake_qty: intake,
            ..Default::default()
        }
    }

    fn board() -> PlanBoard {
        let mut rows = Vec::new();
        for style in ["ST-001", "ST-002", "ST-003"] {
            for week in 10..20 {
                rows.push(row(style, week, i64::from(week)));
            }
        }
        PlanBoard::from_rows(rows)
    }

    #[test]
    fn test_from_rows_builds_groups_and_weeks() {
        let b = board();
        assert_eq!(b.style_count(), 3);
        assert_eq!(b.weeks().first(), Some(&10));
        assert_eq!(b.weeks().len(), 10);
        assert!(b.warnings().is_empty());
    }

    #[test]
    fn test_translate_uses_style_number_and_window_week() {
        let b = board();
        let mut window = WeekWindow::new(b.weeks().to_vec(), 5);
        window.advance();
        let target = b
            .translate(2, Metric::IntakeQty.index(), 4, &window)
            .unwrap();
        assert_eq!(
            target,
            CellTarget {
                style_number: "ST-003".to_string(),
                week_number: 19,
                field: EditField::IntakeQty
            }
        );
    }

    #[test]
    fn test_translate_rejects_derived_metric_and_out_of_range() {
        let b = board();
        let window = WeekWindow::new(b.weeks().to_vec(), 5);
        assert!(b.translate(0, Metric::WhInvQty.index(), 0, &window).is_none());
        assert!(b.translate(9, Metric::SalesQty.index(), 0, &window).is_none());
        assert!(b.translate(0, Metric::SalesQty.index(), 5, &window).is_none());
        assert!(b.translate(0, 42, 0, &window).is_none());
    }

    #[test]
    fn test_apply_patches_row_and_group() {
        let mut b = board();
        let target = CellTarget {
            style_number: "ST-002".to_string(),
            week_number: 12,
            field: EditField::IntakeQty,
        };
        assert_eq!(b.raw_value(&target), Some(12));
        assert!(b.apply(&target, Some(99)));
        assert_eq!(b.raw_value(&target), Some(99));
        let stored = b
            .rows()
            .iter()
            .find(|r| r.style_number == "ST-002" && r.week_number == 12)
            .unwrap();
        assert_eq!(stored.intake_qty, 99);
        assert_eq!(b.value(1, Metric::IntakeQty, 12), MetricValue::Qty(99));
    }

    #[test]
    fn test_apply_creates_missing_week() {
        let mut b = PlanBoard::from_rows(vec![row("A", 1, 0), row("B", 3, 0)]);
        let target = CellTarget { style_number: "A".to_string(), week_number: 3, field: EditField::SalesQty };
        assert!(b.apply(&target, Some(4)));
        assert_eq!(b.group(0).unwrap().week(3).unwrap().sales_qty, 4);
        assert_eq!(b.rows().len(), 3);
        assert_eq!(b.rows()[2].style_name, "A name");
    }

    #[test]
    fn test_apply_before_first_week_keeps_baseline_seed() {
        let mut rows = Vec::new();
        for week in 22..25 {
            let mut r = row("A", week, 5);
            r.store_inv_qty = 10;
            r.wh_inv_qty = if week == 22 { 100 } else { 0 };
            rows.push(r);
        }
        rows.extend((20..25).map(|w| row("B", w, 0)));
        let mut b = PlanBoard::from_rows(rows);
        let wh_before: Vec<_> = (22..25).map(|w| b.value(0, Metric::WhInvQty, w)).collect();

        let target = CellTarget { style_number: "A".to_string(), week_number: 20, field: EditField::SalesQty };
        assert!(!b.apply(&target, Some(7)));
        assert!(b.group(0).unwrap().week(20).is_none());
        assert_eq!(b.rows().len(), 8);
        let wh_after: Vec<_> = (22..25).map(|w| b.value(0, Metric::WhInvQty, w)).collect();
        assert_eq!(wh_before, wh_after);
        assert_eq!(b.value(0, Metric::WhInvQty, 22), MetricValue::Qty(100));
    }

    #[test]
    fn test_apply_unknown_style_is_rejected() {
        let mut b = board();
        let target = CellTarget { style_number: "NOPE".to_string(), week_number: 10, field: EditField::SalesQty };
        assert!(!b.apply(&target, Some(1)));
    }

    #[test]
    fn test_otb_override_raw_value() {
        let mut b = board();
        let target = CellTarget { style_number: "ST-001".to_string(), week_number: 11, field: EditField::Otb };
        assert_eq!(b.raw_value(&target), None);
        b.apply(&target, Some(-30));
        assert_eq!(b.value(0, Metric::Otb, 11), MetricValue::Qty(-30));
        b.apply(&target, None);
        assert_eq!(b.raw_value(&target), None);
    }

    #[test]
    fn test_value_out_of_range_style_is_placeholder() {
        assert_eq!(board().value(7, Metric::SalesQty, 10), MetricValue::Placeholder);
    }
}
