use crate::data::{EditField, WeeklyActual};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::warn;

/// Raw per-week quantities for one style. The only persisted state behind the grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeekData {
    pub sales_qty: i64,
    pub store_inv_qty: i64,
    /// Baseline warehouse inventory; only the first known week's value is used.
    pub wh_inv_qty: i64,
    pub intake_qty: i64,
    pub otb_override: Option<i64>,
}

impl WeekData {
    fn from_row(row: &WeeklyActual) -> Self {
        WeekData {
            sales_qty: row.sales_qty,
            store_inv_qty: row.store_inv_qty,
            wh_inv_qty: row.wh_inv_qty,
            intake_qty: row.intake_qty,
            otb_override: row.otb,
        }
    }

    pub fn field(&self, field: EditField) -> Option<i64> {
        match field {
            EditField::SalesQty => Some(self.sales_qty),
            EditField::StoreInvQty => Some(self.store_inv_qty),
            EditField::IntakeQty => Some(self.intake_qty),
            EditField::Otb => self.otb_override,
        }
    }

    pub fn set_field(&mut self, field: EditField, value: Option<i64>) {
        match field {
            EditField::SalesQty => self.sales_qty = value.unwrap_or(0),
            EditField::StoreInvQty => self.store_inv_qty = value.unwrap_or(0),
            EditField::IntakeQty => self.intake_qty = value.unwrap_or(0),
            EditField::Otb => self.otb_override = value,
        }
    }
}

/// All weeks of one style number, folded from the flat row list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleGroup {
    pub style_number: String,
    pub style_name: String,
    pub category: String,
    pub season: String,
    pub division_name: String,
    pub total_plan_qty: i64,
    pub weeks: BTreeMap<u32, WeekData>,
}

impl StyleGroup {
    fn seeded_from(row: &WeeklyActual) -> Self {
        StyleGroup {
            style_number: row.style_number.clone(),
            style_name: row.style_name.clone(),
            category: row.category.clone(),
            season: row.season.clone(),
            division_name: row.division_name.clone(),
            total_plan_qty: row.total_plan_qty,
            weeks: BTreeMap::new(),
        }
    }

    /// Name of the first descriptive attribute on `row` that disagrees with this group.
    fn diverging_attribute(&self, row: &WeeklyActual) -> Option<&'static str> {
        if self.style_name != row.style_name {
            Some("styleName")
        } else if self.category != row.category {
            Some("category")
        } else if self.season != row.season {
            Some("season")
        } else if self.division_name != row.division_name {
            Some("divisionName")
        } else if self.total_plan_qty != row.total_plan_qty {
            Some("totalPlanQty")
        } else {
            None
        }
    }

    pub fn week(&self, week_number: u32) -> Option<&WeekData> {
        self.weeks.get(&week_number)
    }

    /// True when `week_number` lies before every week this style has data for.
    pub fn precedes_first_week(&self, week_number: u32) -> bool {
        self.weeks
            .keys()
            .next()
            .is_some_and(|first| week_number < *first)
    }
}

/// Data-quality findings raised while grouping. None of them stop the fold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataWarning {
    /// Two rows for the same (style, week); the later one was kept.
    DuplicateWeek { style: String, week: u32 },
    /// A row disagreed with the first row's descriptive attributes; the first was kept.
    AttributeMismatch { style: String, week: u32, field: &'static str },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::DuplicateWeek { style, week } => {
                write!(f, "{style}: duplicate rows for week {week}, last row kept")
            }
            DataWarning::AttributeMismatch { style, week, field } => {
                write!(f, "{style}: week {week} disagrees on {field}, first row kept")
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Grouping {
    pub groups: Vec<StyleGroup>,
    pub warnings: Vec<DataWarning>,
}

/// Folds rows into one group per style number, in order of first appearance.
pub fn group_rows(rows: &[WeeklyActual]) -> Grouping {
    let mut groups: Vec<StyleGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut warnings = Vec::new();

    for row in rows {
        let slot = *index.entry(row.style_number.as_str()).or_insert_with(|| {
            groups.push(StyleGroup::seeded_from(row));
            groups.len() - 1
        });
        let group = &mut groups[slot];

        if let Some(field) = group.diverging_attribute(row) {
            warnings.push(DataWarning::AttributeMismatch {
                style: row.style_number.clone(),
                week: row.week_number,
                field,
            });
        }
        if group
            .weeks
            .insert(row.week_number, WeekData::from_row(row))
            .is_some()
        {
            warnings.push(DataWarning::DuplicateWeek {
                style: row.style_number.clone(),
                week: row.week_number,
            });
        }
    }

    for w in &warnings {
        warn!(warning = %w, "row data quality");
    }
    Grouping { groups, warnings }
}

pub fn group_by_style(rows: &[WeeklyActual]) -> Vec<StyleGroup> {
    group_rows(rows).groups
}

/// Distinct week numbers across all rows, ascending.
pub fn all_week_numbers(rows: &[WeeklyActual]) -> Vec<u32> {
    let mut weeks: Vec<u32> = rows.iter().map(|r| r.week_number).collect();
    weeks.sort_unstable();
    weeks.dedup();
    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(style: &str, week: u32, sales: i64) -> WeeklyActual {
        WeeklyActual {
            style_number: style.to_string(),
            style_name: format!("{style} name"),
            category: "Tops".to_string(),
            total_plan_qty: 500,
            week_number: week,
            sales_qty: sales,
            ..Default::default()
        }
    }

    #[test]
    fn test_groups_preserve_first_appearance_order() {
        let rows = vec![row("B", 1, 1), row("A", 1, 2), row("B", 2, 3), row("C", 1, 4)];
        let groups = group_by_style(&rows);
        let order: Vec<_> = groups.iter().map(|g| g.style_number.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
        assert_eq!(groups[0].weeks.len(), 2);
    }

    #[test]
    fn test_group_seeds_descriptive_fields() {
        let groups = group_by_style(&[row("ST-001", 4, 9)]);
        let g = &groups[0];
        assert_eq!(g.style_name, "ST-001 name");
        assert_eq!(g.category, "Tops");
        assert_eq!(g.total_plan_qty, 500);
        assert_eq!(g.week(4).unwrap().sales_qty, 9);
        assert!(g.week(5).is_none());
    }

    #[test]
    fn test_duplicate_week_last_row_wins_and_warns() {
        let grouping = group_rows(&[row("A", 1, 10), row("A", 1, 99)]);
        assert_eq!(grouping.groups[0].week(1).unwrap().sales_qty, 99);
        assert_eq!(
            grouping.warnings,
            vec![DataWarning::DuplicateWeek { style: "A".to_string(), week: 1 }]
        );
    }

    #[test]
    fn test_attribute_mismatch_keeps_first_and_warns() {
        let mut second = row("A", 2, 1);
        second.total_plan_qty = 900;
        let grouping = group_rows(&[row("A", 1, 1), second]);
        assert_eq!(grouping.groups[0].total_plan_qty, 500);
        assert_eq!(
            grouping.warnings,
            vec![DataWarning::AttributeMismatch {
                style: "A".to_string(),
                week: 2,
                field: "totalPlanQty"
            }]
        );
    }

    #[test]
    fn test_clean_rows_produce_no_warnings() {
        let grouping = group_rows(&[row("A", 1, 1), row("A", 2, 1), row("B", 1, 1)]);
        assert!(grouping.warnings.is_empty());
    }

    #[test]
    fn test_all_week_numbers_sorted_distinct() {
        let rows = vec![row("A", 5, 0), row("B", 2, 0), row("A", 2, 0), row("C", 9, 0)];
        assert_eq!(all_week_numbers(&rows), vec![2, 5, 9]);
    }

    #[test]
    fn test_empty_input() {
        let grouping = group_rows(&[]);
        assert!(grouping.groups.is_empty());
        assert!(grouping.warnings.is_empty());
        assert!(all_week_numbers(&[]).is_empty());
    }

    #[test]
    fn test_week_data_field_roundtrip() {
        let mut w = WeekData::default();
        w.set_field(EditField::StoreInvQty, Some(12));
        assert_eq!(w.field(EditField::StoreInvQty), Some(12));
        assert_eq!(w.field(EditField::Otb), None);
        w.set_field(EditField::Otb, Some(3));
        assert_eq!(w.otb_override, Some(3));
    }

    fn unique_rows() -> impl Strategy<Value = Vec<WeeklyActual>> {
        proptest::collection::btree_map((0u8..4, 0u32..20), 0i64..500, 0..30).prop_map(|m| {
            m.into_iter()
                .map(|((s, w), sales)| row(&format!("S{s}"), w, sales))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_grouping_is_order_independent_without_duplicates(
            (rows, shuffled) in unique_rows().prop_flat_map(|rows| {
                let shuffled = Just(rows.clone()).prop_shuffle();
                (Just(rows), shuffled)
            })
        ) {
            let mut a = group_by_style(&rows);
            let mut b = group_by_style(&shuffled);
            a.sort_by(|x, y| x.style_number.cmp(&y.style_number));
            b.sort_by(|x, y| x.style_number.cmp(&y.style_number));
            prop_assert_eq!(a, b);
        }
    }
}
