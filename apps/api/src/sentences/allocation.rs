//! Sentence allocation. A sentence is offered to a contributor only while they
//! have not recorded it themselves and fewer than `cap` distinct contributors
//! have recorded it.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::models::recording::SentenceContribution;

/// Distinct contributors per sentence text.
pub struct ContributorIndex<'a> {
    by_sentence: HashMap<&'a str, HashSet<Uuid>>,
}

impl<'a> ContributorIndex<'a> {
    pub fn build(contributions: &'a [SentenceContribution]) -> Self {
        let mut by_sentence: HashMap<&str, HashSet<Uuid>> = HashMap::new();
        for c in contributions {
            by_sentence
                .entry(c.sentence.as_str())
                .or_default()
                .insert(c.user_id);
        }
        Self { by_sentence }
    }

    pub fn is_open_to(&self, sentence: &str, user_id: Uuid, cap: usize) -> bool {
        match self.by_sentence.get(sentence) {
            Some(users) => !users.contains(&user_id) && users.len() < cap,
            None => cap > 0,
        }
    }
}

/// Keeps the sentences `user_id` may still record, in input order.
pub fn available_sentences_for_user<T: AsRef<str>>(
    sentences: Vec<T>,
    contributions: &[SentenceContribution],
    user_id: Uuid,
    cap: usize,
) -> Vec<T> {
    let index = ContributorIndex::build(contributions);
    sentences
        .into_iter()
        .filter(|s| index.is_open_to(s.as_ref(), user_id, cap))
        .collect()
}

pub fn can_record(
    contributions: &[SentenceContribution],
    user_id: Uuid,
    sentence: &str,
    cap: usize,
) -> bool {
    check_allocation(contributions, user_id, sentence, cap) == Allocation::Open
}

/// Whether a user may record a sentence, and if not, which rule blocks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    Open,
    AlreadyRecorded,
    Full,
}

pub fn check_allocation(
    contributions: &[SentenceContribution],
    user_id: Uuid,
    sentence: &str,
    cap: usize,
) -> Allocation {
    let index = ContributorIndex::build(contributions);
    match index.by_sentence.get(sentence) {
        Some(users) if users.contains(&user_id) => Allocation::AlreadyRecorded,
        _ if index.is_open_to(sentence, user_id, cap) => Allocation::Open,
        _ => Allocation::Full,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceStats {
    pub total_recordings: usize,
    pub unique_contributors: usize,
}

pub fn sentence_stats(contributions: &[SentenceContribution], sentence: &str) -> SentenceStats {
    let matching: Vec<&SentenceContribution> = contributions
        .iter()
        .filter(|c| c.sentence == sentence)
        .collect();
    let unique: HashSet<Uuid> = matching.iter().map(|c| c.user_id).collect();
    SentenceStats {
        total_recordings: matching.len(),
        unique_contributors: unique.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 3;

    fn contribution(sentence: &str, user_id: Uuid) -> SentenceContribution {
        SentenceContribution {
            sentence: sentence.to_string(),
            user_id,
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sentence_full_after_three_contributors() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let contributions = vec![
            contribution("Nyathi ringo", a),
            contribution("Nyathi ringo", b),
            contribution("Nyathi ringo", c),
            contribution("Chiemo ni mit", a),
        ];

        let available = available_sentences_for_user(
            texts(&["Nyathi ringo", "Chiemo ni mit", "Koth biro"]),
            &contributions,
            d,
            CAP,
        );
        assert_eq!(available, texts(&["Chiemo ni mit", "Koth biro"]));
        assert!(!can_record(&contributions, d, "Nyathi ringo", CAP));
    }

    #[test]
    fn test_user_cannot_record_same_sentence_twice() {
        let a = Uuid::new_v4();
        let contributions = vec![contribution("Chiemo ni mit", a)];
        assert!(!can_record(&contributions, a, "Chiemo ni mit", CAP));
        assert!(can_record(&contributions, Uuid::new_v4(), "Chiemo ni mit", CAP));
    }

    #[test]
    fn test_repeat_recordings_count_once_towards_cap() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let contributions = vec![
            contribution("Koth biro", a),
            contribution("Koth biro", a),
            contribution("Koth biro", b),
        ];
        assert!(can_record(&contributions, c, "Koth biro", CAP));
        assert_eq!(
            sentence_stats(&contributions, "Koth biro"),
            SentenceStats {
                total_recordings: 3,
                unique_contributors: 2
            }
        );
    }

    #[test]
    fn test_input_order_preserved() {
        let available = available_sentences_for_user(
            texts(&["c", "a", "b"]),
            &[],
            Uuid::new_v4(),
            CAP,
        );
        assert_eq!(available, texts(&["c", "a", "b"]));
    }

    #[test]
    fn test_configurable_cap() {
        let a = Uuid::new_v4();
        let contributions = vec![contribution("Koth biro", a)];
        assert!(!can_record(&contributions, Uuid::new_v4(), "Koth biro", 1));
        assert!(can_record(&contributions, Uuid::new_v4(), "Koth biro", 2));
    }

    #[test]
    fn test_check_allocation_names_the_blocking_rule() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let contributions = vec![
            contribution("Koth biro", a),
            contribution("Koth biro", b),
            contribution("Koth biro", c),
        ];
        assert_eq!(
            check_allocation(&contributions, a, "Koth biro", CAP),
            Allocation::AlreadyRecorded
        );
        assert_eq!(
            check_allocation(&contributions, Uuid::new_v4(), "Koth biro", CAP),
            Allocation::Full
        );
        assert_eq!(
            check_allocation(&contributions[..2], c, "Koth biro", CAP),
            Allocation::Open
        );
    }
}
