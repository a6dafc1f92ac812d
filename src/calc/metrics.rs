use crate::calc::grouper::StyleGroup;
use crate::data::EditField;
use std::fmt;

/// The seven rows shown per style, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    SalesQty,
    StoreInvQty,
    StoreWks,
    WhInvQty,
    WhWks,
    IntakeQty,
    Otb,
}

pub const METRIC_COUNT: usize = 7;

impl Metric {
    pub const ALL: [Metric; METRIC_COUNT] = [
        Metric::SalesQty,
        Metric::StoreInvQty,
        Metric::StoreWks,
        Metric::WhInvQty,
        Metric::WhWks,
        Metric::IntakeQty,
        Metric::Otb,
    ];

    pub fn from_index(index: usize) -> Option<Metric> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::SalesQty => "Sales",
            Metric::StoreInvQty => "Store Inv",
            Metric::StoreWks => "Store Wks",
            Metric::WhInvQty => "WH Inv",
            Metric::WhWks => "WH Wks",
            Metric::IntakeQty => "Intake",
            Metric::Otb => "OTB",
        }
    }

    /// The raw field an edit of this metric writes, if the metric is editable.
    pub fn edit_field(self) -> Option<EditField> {
        match self {
            Metric::SalesQty => Some(EditField::SalesQty),
            Metric::StoreInvQty => Some(EditField::StoreInvQty),
            Metric::IntakeQty => Some(EditField::IntakeQty),
            Metric::Otb => Some(EditField::Otb),
            Metric::StoreWks | Metric::WhInvQty | Metric::WhWks => None,
        }
    }

    pub fn is_editable(self) -> bool {
        self.edit_field().is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
    Qty(i64),
    /// Weeks of supply, already rounded to one decimal.
    Ratio(f64),
    /// Shown when a ratio has no sales to divide by.
    Placeholder,
}

impl MetricValue {
    pub fn as_qty(self) -> Option<i64> {
        match self {
            MetricValue::Qty(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            MetricValue::Qty(n) => n < 0,
            MetricValue::Ratio(x) => x < 0.0,
            MetricValue::Placeholder => false,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Qty(n) => write!(f, "{n}"),
            MetricValue::Ratio(x) => write!(f, "{x:.1}"),
            MetricValue::Placeholder => f.write_str("-"),
        }
    }
}

/// Derives one metric for `week`. Pure: depends only on the group's raw weeks
/// and the ascending list of all known week numbers.
pub fn compute(group: &StyleGroup, metric: Metric, week: u32, all_weeks: &[u32]) -> MetricValue {
    match metric {
        Metric::SalesQty => MetricValue::Qty(sales_qty(group, week)),
        Metric::StoreInvQty => MetricValue::Qty(store_inv_qty(group, week)),
        Metric::IntakeQty => MetricValue::Qty(intake_qty(group, week)),
        Metric::StoreWks => weeks_of_supply(store_inv_qty(group, week), sales_qty(group, week)),
        Metric::WhInvQty => MetricValue::Qty(wh_inv_qty(group, week, all_weeks)),
        Metric::WhWks => weeks_of_supply(
            wh_inv_qty(group, week, all_weeks),
            sales_qty(group, week),
        ),
        Metric::Otb => MetricValue::Qty(otb(group, week, all_weeks)),
    }
}

pub fn sales_qty(group: &StyleGroup, week: u32) -> i64 {
    group.week(week).map(|w| w.sales_qty).unwrap_or(0)
}

pub fn store_inv_qty(group: &StyleGroup, week: u32) -> i64 {
    group.week(week).map(|w| w.store_inv_qty).unwrap_or(0)
}

pub fn intake_qty(group: &StyleGroup, week: u32) -> i64 {
    group.week(week).map(|w| w.intake_qty).unwrap_or(0)
}

/// Known weeks of this style up to and including `week`, ascending.
fn known_weeks_through<'a>(
    group: &'a StyleGroup,
    week: u32,
    all_weeks: &'a [u32],
) -> impl Iterator<Item = u32> + 'a {
    all_weeks
        .iter()
        .copied()
        .take_while(move |w| *w <= week)
        .filter(move |w| group.weeks.contains_key(w))
}

/// Cumulative warehouse inventory: seeded from the first known week's baseline,
/// then carried forward by `intake - store inventory` for every later week.
pub fn wh_inv_qty(group: &StyleGroup, week: u32, all_weeks: &[u32]) -> i64 {
    let mut weeks = known_weeks_through(group, week, all_weeks);
    let Some(first) = weeks.next() else {
        return 0;
    };
    let seed = group.week(first).map(|w| w.wh_inv_qty).unwrap_or(0);
    weeks.fold(seed, |balance, w| {
        balance + intake_qty(group, w) - store_inv_qty(group, w)
    })
}

/// Sales summed over every known week up to and including `week`.
pub fn sales_to_date(group: &StyleGroup, week: u32, all_weeks: &[u32]) -> i64 {
    known_weeks_through(group, week, all_weeks)
        .map(|w| sales_qty(group, w))
        .sum()
}

/// Open-to-buy. A stored planner override takes precedence over the formula.
/// Negative results (over-bought) are valid.
pub fn otb(group: &StyleGroup, week: u32, all_weeks: &[u32]) -> i64 {
    if let Some(value) = group.week(week).and_then(|w| w.otb_override) {
        return value;
    }
    group.total_plan_qty
        - (sales_to_date(group, week, all_weeks)
            + store_inv_qty(group, week)
            + wh_inv_qty(group, week, all_weeks)
            + intake_qty(group, week))
}

fn weeks_of_supply(inventory: i64, sales: i64) -> MetricValue {
    if sales == 0 {
        return MetricValue::Placeholder;
    }
    let ratio = inventory as f64 / sales as f64;
    MetricValue::Ratio((ratio * 10.0).round() / 10.0)
}
