use crate::calc::week_window::{current_week, week_label};
use crate::calc::{Metric, PlanBoard};
use crate::data::AppSettings;
use crate::data::persistence::get_data_dir;
use crate::data::store::{load_rows, open_store};
use anyhow::{Result, bail};
use chrono::Local;
use std::io::Write;

const LABEL_WIDTH: usize = 10;
const VALUE_WIDTH: usize = 9;

/// Which slice of the board a report covers.
#[derive(Debug, Clone, Default)]
pub struct ReportScope {
    pub style: Option<String>,
    pub from_week: Option<u32>,
    pub weeks: Option<usize>,
}

pub fn run(settings: &AppSettings, scope: &ReportScope) -> Result<()> {
    let store = open_store(settings.api_base_url.as_deref(), &get_data_dir()?)?;
    let rows = load_rows(store.as_ref(), &settings.years, settings.season)?;
    let board = PlanBoard::from_rows(rows);
    let from = scope
        .from_week
        .unwrap_or_else(|| current_week(Local::now().date_naive(), settings.anchor_year));
    let count = scope.weeks.unwrap_or(settings.window_size);

    write_report(
        &board,
        &select_weeks(board.weeks(), from, count),
        scope.style.as_deref(),
        settings,
        &mut std::io::stdout(),
    )
}

/// Up to `count` known weeks starting at the first week >= `from`.
pub(crate) fn select_weeks(all: &[u32], from: u32, count: usize) -> Vec<u32> {
    all.iter().copied().filter(|w| *w >= from).take(count).collect()
}

pub(crate) fn write_report<W: Write>(
    board: &PlanBoard,
    weeks: &[u32],
    style: Option<&str>,
    settings: &AppSettings,
    out: &mut W,
) -> Result<()> {
    let indices: Vec<usize> = match style {
        Some(s) => match board.groups().iter().position(|g| g.style_number == s) {
            Some(idx) => vec![idx],
            None => bail!("Style '{}' not found for {}.", s, settings.scope_label()),
        },
        None => (0..board.style_count()).collect(),
    };

    writeln!(out, "WSSI / OTB report for {}", settings.scope_label())?;
    match (weeks.first(), weeks.last()) {
        (Some(a), Some(b)) => writeln!(out, "Weeks: [W{a} - W{b}]")?,
        _ => {
            writeln!(out, "No weeks in range.")?;
            return Ok(());
        }
    }

    let labels: Vec<(String, String)> =
        weeks.iter().map(|w| week_label(*w, settings.anchor_year)).collect();

    for idx in indices {
        let Some(group) = board.group(idx) else {
            continue;
        };
        writeln!(out, "---")?;
        writeln!(
            out,
            "{} {} ({} / {}) plan {}",
            group.style_number, group.style_name, group.category, group.division_name, group.total_plan_qty
        )?;

        write!(out, "{:<LABEL_WIDTH$}", "")?;
        for (top, _) in &labels {
            write!(out, "{top:>VALUE_WIDTH$}")?;
        }
        writeln!(out)?;
        write!(out, "{:<LABEL_WIDTH$}", "")?;
        for (_, date) in &labels {
            write!(out, "{date:>VALUE_WIDTH$}")?;
        }
        writeln!(out)?;

        for metric in Metric::ALL {
            write!(out, "{:<LABEL_WIDTH$}", metric.label())?;
            for &week in weeks {
                let value = board.value(idx, metric, week).to_string();
                write!(out, "{value:>VALUE_WIDTH$}")?;
            }
            writeln!(out)?;
        }
    }
    writeln!(out, "---")?;

    Ok(())
}
