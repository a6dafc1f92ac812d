use crate::calc::PlanBoard;
use crate::data::AppSettings;
use crate::data::persistence::get_data_dir;
use crate::data::store::{load_rows, open_store};
use anyhow::Result;

pub fn run(settings: &AppSettings) -> Result<()> {
    let store = open_store(settings.api_base_url.as_deref(), &get_data_dir()?)?;
    let rows = load_rows(store.as_ref(), &settings.years, settings.season)?;
    write_styles(&PlanBoard::from_rows(rows), settings, &mut std::io::stdout())
}

pub(crate) fn write_styles<W: std::io::Write>(
    board: &PlanBoard,
    settings: &AppSettings,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "Styles ({})", settings.scope_label())?;
    writeln!(out, "---")?;
    writeln!(
        out,
        "  {:<10} {:<24} {:<12} {:<10} {:>6} {:>11} {:>8} {}",
        "Style", "Name", "Category", "Division", "Weeks", "Range", "Plan", "Launch"
    )?;
    for group in board.groups() {
        let range = match (group.weeks.keys().next(), group.weeks.keys().next_back()) {
            (Some(a), Some(b)) => format!("W{a}-W{b}"),
            _ => "-".to_string(),
        };
        let launch = board
            .rows()
            .iter()
            .filter(|r| r.style_number == group.style_number)
            .find_map(|r| r.launch_date)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "  {:<10} {:<24} {:<12} {:<10} {:>6} {:>11} {:>8} {}",
            group.style_number,
            group.style_name,
            group.category,
            group.division_name,
            group.weeks.len(),
            range,
            group.total_plan_qty,
            launch
        )?;
    }
    writeln!(out, "---")?;
    writeln!(out, "Total: {} style(s)", board.style_count())?;

    let warnings = board.warnings();
    if !warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "Data warnings ({})", warnings.len())?;
        for w in warnings {
            writeln!(out, "  {w}")?;
        }
    }
    Ok(())
}
