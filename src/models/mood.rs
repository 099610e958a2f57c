use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Terrible,
    Bad,
    Okay,
    Good,
    Great,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Terrible,
        Mood::Bad,
        Mood::Okay,
        Mood::Good,
        Mood::Great,
    ];

    /// Position on the 1-5 scale. 0 is reserved for "no entry".
    pub fn value(self) -> u8 {
        match self {
            Mood::Terrible => 1,
            Mood::Bad => 2,
            Mood::Okay => 3,
            Mood::Good => 4,
            Mood::Great => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoodEntry {
    pub id: String,
    pub date: NaiveDate,
    pub mood: Mood,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_scale_is_one_to_five_in_order() {
        let values: Vec<u8> = Mood::ALL.iter().map(|m| m.value()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn entry_serializes_with_plain_date_and_lowercase_mood() {
        let entry = MoodEntry {
            id: "abc".into(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            mood: Mood::Great,
            notes: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": "abc", "date": "2024-05-01", "mood": "great" })
        );
    }
}
