use crate::calc::PlanBoard;
use crate::data::app_settings::SettingsWrapper;
use crate::data::persistence::get_data_dir;
use crate::data::store::open_store;
use crate::data::{AppSettings, Persistable};
use crate::sync::SyncLayer;
use crate::ui::grid_view::{App, run_app};
use crate::ui::{restore_terminal, setup_terminal};
use anyhow::Result;
use chrono::Local;
use std::path::Path;
use tracing::info;

pub fn run(settings: AppSettings) -> Result<()> {
    let data_dir = get_data_dir()?;
    let store = open_store(settings.api_base_url.as_deref(), &data_dir)?;
    info!(source = %store.describe(), scope = %settings.scope_label(), "starting grid");

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture
        );
        original_hook(info);
    }));

    let mut terminal = setup_terminal()?;

    let today = Local::now().date_naive();
    let mut app = App::new(PlanBoard::default(), SyncLayer::new(store), settings, today)
        .with_system_clipboard(true);
    app.reload();
    app.focus_current();

    let result = run_app(&mut terminal, &mut app);

    restore_terminal(&mut terminal)?;
    app.shutdown();

    if app.season_toggled() {
        save_season(app.settings.season, &data_dir)?;
    }
    result
}

/// Remembers the last viewed season in config.yaml, leaving every other setting as written.
pub(crate) fn save_season(season: u8, dir: &Path) -> Result<()> {
    let mut config = SettingsWrapper::load_from(dir)?;
    if config.settings.season != season {
        config.settings.season = season;
        config.save_to(dir)?;
    }
    Ok(())
}
