use crate::calc::week_window::week_start;
use crate::data::app_settings::{SettingsWrapper, default_years};
use crate::data::{AppSettings, Persistable, WeeklyActual, WeeklyActualData};
use anyhow::Result;
use chrono::{Datelike, Local};
use std::fs;
use std::path::Path;
use tracing::info;

/// Weeks of sample history written by `init`: two planning years.
const SAMPLE_WEEKS: u32 = 104;
const WEEKS_PER_YEAR: u32 = 52;

struct SampleStyle {
    number: &'static str,
    name: &'static str,
    category: &'static str,
    division: &'static str,
    plan: i64,
    base_sales: i64,
    wh_seed: i64,
    intake: i64,
}

const SAMPLE_STYLES: [SampleStyle; 3] = [
    SampleStyle {
        number: "ST-1001",
        name: "Linen Camp Shirt",
        category: "Tops",
        division: "Mens",
        plan: 9000,
        base_sales: 40,
        wh_seed: 2400,
        intake: 180,
    },
    SampleStyle {
        number: "ST-1002",
        name: "Pleated Midi Skirt",
        category: "Bottoms",
        division: "Womens",
        plan: 6500,
        base_sales: 25,
        wh_seed: 1600,
        intake: 120,
    },
    SampleStyle {
        number: "ST-1003",
        name: "Merino Crew Knit",
        category: "Knitwear",
        division: "Womens",
        plan: 4200,
        base_sales: 15,
        wh_seed: 900,
        intake: 90,
    },
];

pub fn run() -> Result<()> {
    let dir = crate::data::persistence::get_data_dir()?;
    fs::create_dir_all(&dir)?;
    run_in_dir(&dir, Local::now().year())?;
    println!("Data files initialized successfully.");
    Ok(())
}

/// Writes config.yaml and the sample row store into `dir`. Exposed for unit testing.
pub(crate) fn run_in_dir(dir: &Path, anchor_year: i32) -> Result<()> {
    write_config(dir, anchor_year)?;
    write_rows(dir, anchor_year)?;
    info!(dir = %dir.display(), anchor_year, "data files initialized");
    Ok(())
}

fn write_config(dir: &Path, anchor_year: i32) -> Result<()> {
    let config = SettingsWrapper {
        settings: AppSettings {
            years: default_years(anchor_year),
            anchor_year,
            ..Default::default()
        },
    };
    config.save_to(dir)
}

fn write_rows(dir: &Path, anchor_year: i32) -> Result<()> {
    WeeklyActualData { rows: sample_rows(anchor_year) }.save_to(dir)
}

pub(crate) fn sample_rows(anchor_year: i32) -> Vec<WeeklyActual> {
    let mut rows = Vec::with_capacity(SAMPLE_STYLES.len() * SAMPLE_WEEKS as usize);
    for (i, style) in SAMPLE_STYLES.iter().enumerate() {
        let offset = i as i64 * 3;
        let launch = week_start(0, anchor_year);
        for week in 0..SAMPLE_WEEKS {
            let wave = (i64::from(week) * 7 + offset) % 13;
            let sales = style.base_sales + wave;
            rows.push(WeeklyActual {
                style_number: style.number.to_string(),
                style_name: style.name.to_string(),
                category: style.category.to_string(),
                season: "1".to_string(),
                division_name: style.division.to_string(),
                total_plan_qty: style.plan,
                week_number: week,
                year: anchor_year + (week / WEEKS_PER_YEAR) as i32,
                sales_qty: sales,
                store_inv_qty: sales * 3,
                wh_inv_qty: if week == 0 { style.wh_seed } else { 0 },
                intake_qty: if week % 4 == 0 { style.intake } else { 0 },
                otb: None,
                launch_date: Some(launch),
                in_store_date: Some(week_start(1, anchor_year)),
                exit_date: Some(week_start(SAMPLE_WEEKS - 1, anchor_year)),
            });
        }
    }
    rows
}
