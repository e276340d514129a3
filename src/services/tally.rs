//! Ranked-choice tally over submitted ballots.

use indexmap::IndexMap;

use crate::dao::models::{NominationMap, RankingMap, ResultEntryEntity};

/// Compute the aggregate ranking from the submitted ballots.
///
/// Positional scoring: a ballot of length L awards L points to its first
/// entry, L-1 to the second, down to 1 for the last. Ballot entries that no
/// longer reference a live nomination are dropped before weighting, so a
/// stale client submission cannot skew the weights of the remaining picks.
///
/// Output contains only nominations with a positive score, sorted descending;
/// ties keep nomination submission order. Pure and deterministic: the result
/// does not depend on ballot iteration order.
pub fn compute_results(nominations: &NominationMap, rankings: &RankingMap) -> Vec<ResultEntryEntity> {
    // Seeded in nomination submission order; the stable sort below preserves
    // that order among equal scores.
    let mut scores: IndexMap<&str, i64> = nominations
        .keys()
        .map(|id| (id.as_str(), 0i64))
        .collect();

    for ballot in rankings.values() {
        let picks: Vec<&str> = ballot
            .iter()
            .map(String::as_str)
            .filter(|id| nominations.contains_key(*id))
            .collect();
        let top_weight = picks.len() as i64;
        for (position, id) in picks.iter().enumerate() {
            if let Some(score) = scores.get_mut(id) {
                *score += top_weight - position as i64;
            }
        }
    }

    let mut entries: Vec<ResultEntryEntity> = scores
        .into_iter()
        .filter(|(_, score)| *score > 0)
        .map(|(id, score)| ResultEntryEntity {
            nomination_id: id.to_owned(),
            nomination_text: nominations[id].text.clone(),
            score,
        })
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::NominationEntity;

    fn nomination(text: &str) -> NominationEntity {
        NominationEntity {
            user_id: "u0".into(),
            text: text.into(),
        }
    }

    fn nominations(entries: &[(&str, &str)]) -> NominationMap {
        entries
            .iter()
            .map(|(id, text)| (id.to_string(), nomination(text)))
            .collect()
    }

    fn rankings(entries: &[(&str, &[&str])]) -> RankingMap {
        entries
            .iter()
            .map(|(voter, picks)| {
                (
                    voter.to_string(),
                    picks.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn worked_example_scores_and_omits_unranked() {
        let noms = nominations(&[("a", "A"), ("b", "B"), ("c", "C")]);
        let ballots = rankings(&[
            ("v1", &["a", "b"] as &[&str]),
            ("v2", &["b", "a"]),
            ("v3", &["a"]),
        ]);

        let results = compute_results(&noms, &ballots);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].nomination_id, "a");
        assert_eq!(results[0].score, 4);
        assert_eq!(results[1].nomination_id, "b");
        assert_eq!(results[1].score, 3);
    }

    #[test]
    fn deterministic_under_ballot_reordering() {
        let noms = nominations(&[("a", "A"), ("b", "B"), ("c", "C")]);
        let forward = rankings(&[
            ("v1", &["a", "b", "c"] as &[&str]),
            ("v2", &["c", "b"]),
            ("v3", &["b"]),
        ]);
        let backward = rankings(&[
            ("v3", &["b"] as &[&str]),
            ("v2", &["c", "b"]),
            ("v1", &["a", "b", "c"]),
        ]);

        assert_eq!(
            compute_results(&noms, &forward),
            compute_results(&noms, &backward)
        );
    }

    #[test]
    fn ties_keep_nomination_submission_order() {
        let noms = nominations(&[("first", "F"), ("second", "S")]);
        let ballots = rankings(&[("v1", &["second"] as &[&str]), ("v2", &["first"])]);

        let results = compute_results(&noms, &ballots);

        assert_eq!(results[0].nomination_id, "first");
        assert_eq!(results[1].nomination_id, "second");
        assert_eq!(results[0].score, results[1].score);
    }

    #[test]
    fn stale_ballot_entries_are_ignored_before_weighting() {
        let noms = nominations(&[("a", "A"), ("b", "B")]);
        // "ghost" was nominated, ranked, then removed pre-start.
        let ballots = rankings(&[("v1", &["ghost", "a", "b"] as &[&str])]);

        let results = compute_results(&noms, &ballots);

        // The filtered ballot has length 2, so "a" gets 2, "b" gets 1.
        assert_eq!(results[0].nomination_id, "a");
        assert_eq!(results[0].score, 2);
        assert_eq!(results[1].score, 1);
    }

    #[test]
    fn no_ballots_produce_empty_results() {
        let noms = nominations(&[("a", "A")]);
        assert!(compute_results(&noms, &RankingMap::new()).is_empty());
    }
}
