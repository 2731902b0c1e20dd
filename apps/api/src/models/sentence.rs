use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Basic,
    Medium,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Basic => "basic",
            Difficulty::Medium => "medium",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn from_word_count(words: usize) -> Self {
        match words {
            0..=5 => Difficulty::Basic,
            6..=10 => Difficulty::Medium,
            _ => Difficulty::Advanced,
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "basic" => Ok(Difficulty::Basic),
            "medium" => Ok(Difficulty::Medium),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(UnknownVariant::new("difficulty", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sentence {
    pub id: Uuid,
    pub mozilla_id: String,
    pub text: String,
    pub language_code: String,
    pub is_active: bool,
    #[sqlx(try_from = "String")]
    pub difficulty_level: Difficulty,
    pub word_count: Option<i32>,
    pub character_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl AsRef<str> for Sentence {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_thresholds() {
        assert_eq!(Difficulty::from_word_count(1), Difficulty::Basic);
        assert_eq!(Difficulty::from_word_count(5), Difficulty::Basic);
        assert_eq!(Difficulty::from_word_count(6), Difficulty::Medium);
        assert_eq!(Difficulty::from_word_count(11), Difficulty::Advanced);
    }
}
