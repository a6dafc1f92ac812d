use chrono::{Duration, NaiveDate};

/// A fixed-width, pageable slice over the ascending week-number sequence.
#[derive(Clone, Debug)]
pub struct WeekWindow {
    weeks: Vec<u32>,
    size: usize,
    offset: usize,
}

impl WeekWindow {
    pub fn new(weeks: Vec<u32>, size: usize) -> Self {
        WeekWindow { weeks, size: size.max(1), offset: 0 }
    }

    /// Swaps in a new week sequence (after a refetch), keeping the offset in range.
    pub fn set_weeks(&mut self, weeks: Vec<u32>) {
        self.weeks = weeks;
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn all(&self) -> &[u32] {
        &self.weeks
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn max_offset(&self) -> usize {
        self.weeks.len().saturating_sub(self.size)
    }

    pub fn visible(&self) -> &[u32] {
        let end = (self.offset + self.size).min(self.weeks.len());
        &self.weeks[self.offset.min(end)..end]
    }

    /// Week number shown in visible column `col`, if any.
    pub fn week_at(&self, col: usize) -> Option<u32> {
        self.visible().get(col).copied()
    }

    pub fn can_advance(&self) -> bool {
        self.offset < self.max_offset()
    }

    pub fn can_retreat(&self) -> bool {
        self.offset > 0
    }

    /// Moves forward one window width. Returns false when already at the end.
    pub fn advance(&mut self) -> bool {
        let next = (self.offset + self.size).min(self.max_offset());
        let moved = next != self.offset;
        self.offset = next;
        moved
    }

    pub fn retreat(&mut self) -> bool {
        let prev = self.offset.saturating_sub(self.size);
        let moved = prev != self.offset;
        self.offset = prev;
        moved
    }

    /// Positions the window so that it contains `week` (or the first week after it).
    pub fn focus(&mut self, week: u32) {
        let idx = self.weeks.partition_point(|w| *w < week);
        let idx = idx.min(self.weeks.len().saturating_sub(1));
        self.offset = (idx - idx % self.size).min(self.max_offset());
    }
}

/// January 1st of the anchor year; week 0 starts here.
pub fn anchor_date(anchor_year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(anchor_year, 1, 1).unwrap_or_default()
}

/// Synthetic display date for a week: anchor + 7 days per week.
pub fn week_start(week: u32, anchor_year: i32) -> NaiveDate {
    anchor_date(anchor_year) + Duration::days(i64::from(week) * 7)
}

/// Week label for column headers: `W12` and `25 Mar 25`.
pub fn week_label(week: u32, anchor_year: i32) -> (String, String) {
    (
        format!("W{week}"),
        week_start(week, anchor_year).format("%d %b %y").to_string(),
    )
}

/// Whole weeks between the anchor and `today`. Dates before the anchor map to week 0.
pub fn current_week(today: NaiveDate, anchor_year: i32) -> u32 {
    let days = (today - anchor_date(anchor_year)).num_days();
    u32::try_from(days.max(0) / 7).unwrap_or(u32::MAX)
}
