//! Mood statistics, derived on every call from a snapshot of entries.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::mood::{Mood, MoodEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoodDistribution {
    pub terrible: usize,
    pub bad: usize,
    pub okay: usize,
    pub good: usize,
    pub great: usize,
}

impl MoodDistribution {
    pub fn count(&self, mood: Mood) -> usize {
        match mood {
            Mood::Terrible => self.terrible,
            Mood::Bad => self.bad,
            Mood::Okay => self.okay,
            Mood::Good => self.good,
            Mood::Great => self.great,
        }
    }

    pub fn total(&self) -> usize {
        Mood::ALL.iter().map(|m| self.count(*m)).sum()
    }

    fn bump(&mut self, mood: Mood) {
        let slot = match mood {
            Mood::Terrible => &mut self.terrible,
            Mood::Bad => &mut self.bad,
            Mood::Okay => &mut self.okay,
            Mood::Good => &mut self.good,
            Mood::Great => &mut self.great,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    /// Weekday abbreviation, e.g. "Mon".
    pub label: String,
    /// Mood value 1-5, or 0 when nothing was logged that day.
    pub mood: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoodStats {
    pub average_mood: f64,
    pub distribution: MoodDistribution,
    pub weekly: Vec<TrendPoint>,
    pub streak: u32,
    pub total_entries: usize,
}

pub fn average_mood(entries: &[MoodEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let sum: u32 = entries.iter().map(|e| u32::from(e.mood.value())).sum();
    f64::from(sum) / entries.len() as f64
}

pub fn mood_distribution(entries: &[MoodEntry]) -> MoodDistribution {
    let mut distribution = MoodDistribution::default();
    for entry in entries {
        distribution.bump(entry.mood);
    }
    distribution
}

/// The seven days ending `today`, oldest first.
pub fn weekly_trend(entries: &[MoodEntry], today: NaiveDate) -> Vec<TrendPoint> {
    (0..7)
        .rev()
        .map(|days_back| {
            let date = today - Duration::days(days_back);
            let mood = entries
                .iter()
                .find(|e| e.date == date)
                .map(|e| e.mood.value())
                .unwrap_or(0);
            TrendPoint {
                date,
                label: date.format("%a").to_string(),
                mood,
            }
        })
        .collect()
}

/// Consecutive logged days ending at the most recent entry. A most recent
/// entry older than yesterday means the streak is already broken.
pub fn streak(entries: &[MoodEntry], today: NaiveDate) -> u32 {
    let mut dates: Vec<NaiveDate> = entries.iter().map(|e| e.date).collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));

    let Some(latest) = dates.first() else {
        return 0;
    };
    if (today - *latest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1u32;
    for pair in dates.windows(2) {
        if (pair[0] - pair[1]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

pub fn summarize(entries: &[MoodEntry], today: NaiveDate) -> MoodStats {
    MoodStats {
        average_mood: average_mood(entries),
        distribution: mood_distribution(entries),
        weekly: weekly_trend(entries, today),
        streak: streak(entries, today),
        total_entries: entries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(date: NaiveDate, mood: Mood) -> MoodEntry {
        MoodEntry {
            id: date.to_string(),
            date,
            mood,
            notes: None,
        }
    }

    #[test]
    fn average_of_good_good_terrible_is_three() {
        let today = day(2024, 6, 10);
        let entries = vec![
            entry(today - Duration::days(2), Mood::Good),
            entry(today - Duration::days(1), Mood::Good),
            entry(today, Mood::Terrible),
        ];
        assert_eq!(average_mood(&entries), 3.0);
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average_mood(&[]), 0.0);
    }

    #[test]
    fn distribution_covers_every_category_and_sums_to_len() {
        let today = day(2024, 6, 10);
        let entries: Vec<MoodEntry> = [Mood::Bad, Mood::Bad, Mood::Great, Mood::Okay]
            .iter()
            .enumerate()
            .map(|(i, m)| entry(today - Duration::days(i as i64), *m))
            .collect();

        let dist = mood_distribution(&entries);
        assert_eq!(dist.total(), entries.len());
        assert_eq!(dist.bad, 2);
        assert_eq!(dist.great, 1);
        assert_eq!(dist.okay, 1);
        assert_eq!(dist.terrible, 0);
        assert_eq!(dist.good, 0);

        let json = serde_json::to_value(dist).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn weekly_trend_has_seven_points_and_zero_for_gaps() {
        // 2024-06-10 is a Monday.
        let today = day(2024, 6, 10);
        let entries = vec![
            entry(today, Mood::Terrible),
            entry(today - Duration::days(3), Mood::Great),
            entry(today - Duration::days(30), Mood::Good),
        ];

        let trend = weekly_trend(&entries, today);
        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, today - Duration::days(6));
        assert_eq!(trend[6].date, today);
        assert_eq!(trend[6].label, "Mon");
        assert_eq!(trend[0].label, "Tue");

        let values: Vec<u8> = trend.iter().map(|p| p.mood).collect();
        assert_eq!(values, vec![0, 0, 0, 5, 0, 0, 1]);
    }

    #[test]
    fn streak_today_and_yesterday_is_two() {
        let today = day(2024, 6, 10);
        let entries = vec![
            entry(today - Duration::days(1), Mood::Okay),
            entry(today, Mood::Good),
        ];
        assert_eq!(streak(&entries, today), 2);
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let today = day(2024, 6, 10);
        let entries = vec![
            entry(today, Mood::Good),
            entry(today - Duration::days(3), Mood::Okay),
        ];
        assert_eq!(streak(&entries, today), 1);
    }

    #[test]
    fn streak_is_broken_when_latest_entry_is_two_days_old() {
        let today = day(2024, 6, 10);
        let entries = vec![
            entry(today - Duration::days(2), Mood::Good),
            entry(today - Duration::days(3), Mood::Good),
        ];
        assert_eq!(streak(&entries, today), 0);
    }

    #[test]
    fn streak_can_end_yesterday() {
        let today = day(2024, 3, 1);
        // Crosses the leap day.
        let entries = vec![
            entry(day(2024, 2, 28), Mood::Bad),
            entry(day(2024, 2, 29), Mood::Okay),
            entry(day(2024, 2, 27), Mood::Great),
        ];
        assert_eq!(streak(&entries, today), 3);
    }

    #[test]
    fn streak_of_nothing_is_zero() {
        assert_eq!(streak(&[], day(2024, 6, 10)), 0);
    }

    #[test]
    fn summary_bundles_everything() {
        let today = day(2024, 6, 10);
        let entries = vec![entry(today, Mood::Great)];
        let stats = summarize(&entries, today);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.streak, 1);
        assert_eq!(stats.average_mood, 5.0);
        assert_eq!(stats.weekly.len(), 7);
        assert_eq!(stats.distribution.great, 1);
    }
}
