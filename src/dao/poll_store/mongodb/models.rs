use indexmap::IndexMap;
use mongodb::bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{NominationEntity, PollEntity, ResultEntryEntity};
use crate::dao::poll_store::{PollField, PollFieldPath};

/// Persisted shape of one poll, one document per poll keyed by its code.
///
/// Maps are stored as embedded documents so single entries can be addressed
/// with dotted `$set`/`$unset` paths; BSON documents preserve key order, which
/// keeps nomination submission order intact for the tally tie-break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPollDocument {
    #[serde(rename = "_id")]
    id: String,
    topic: String,
    votes_per_voter: usize,
    admin_id: String,
    participants: IndexMap<String, String>,
    nominations: IndexMap<String, NominationEntity>,
    rankings: IndexMap<String, Vec<String>>,
    results: Vec<ResultEntryEntity>,
    has_started: bool,
    created_at: DateTime,
    expires_at: DateTime,
}

impl From<PollEntity> for MongoPollDocument {
    fn from(value: PollEntity) -> Self {
        Self {
            id: value.id,
            topic: value.topic,
            votes_per_voter: value.votes_per_voter,
            admin_id: value.admin_id,
            participants: value.participants,
            nominations: value.nominations,
            rankings: value.rankings,
            results: value.results,
            has_started: value.has_started,
            created_at: DateTime::from_system_time(value.created_at),
            expires_at: DateTime::from_system_time(value.expires_at),
        }
    }
}

impl From<MongoPollDocument> for PollEntity {
    fn from(value: MongoPollDocument) -> Self {
        Self {
            id: value.id,
            topic: value.topic,
            votes_per_voter: value.votes_per_voter,
            admin_id: value.admin_id,
            participants: value.participants,
            nominations: value.nominations,
            rankings: value.rankings,
            results: value.results,
            has_started: value.has_started,
            created_at: value.created_at.to_system_time(),
            expires_at: value.expires_at.to_system_time(),
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

fn nomination_doc(nomination: NominationEntity) -> Document {
    doc! {
        "user_id": nomination.user_id,
        "text": nomination.text,
    }
}

fn result_entry_doc(entry: ResultEntryEntity) -> Document {
    doc! {
        "nomination_id": entry.nomination_id,
        "nomination_text": entry.nomination_text,
        "score": entry.score,
    }
}

/// Dotted field path and BSON value for a single-field write.
pub fn set_update(field: PollField) -> Document {
    let (path, value): (String, Bson) = match field {
        PollField::Participant { id, name } => (format!("participants.{id}"), Bson::from(name)),
        PollField::Nomination { id, nomination } => (
            format!("nominations.{id}"),
            Bson::from(nomination_doc(nomination)),
        ),
        PollField::Ranking {
            participant_id,
            ballot,
        } => (format!("rankings.{participant_id}"), Bson::from(ballot)),
        PollField::Results(entries) => (
            "results".to_owned(),
            Bson::from(
                entries
                    .into_iter()
                    .map(result_entry_doc)
                    .collect::<Vec<_>>(),
            ),
        ),
        PollField::HasStarted(flag) => ("has_started".to_owned(), Bson::from(flag)),
    };
    let mut fields = Document::new();
    fields.insert(path, value);
    doc! { "$set": fields }
}

/// Dotted field path for a single-field delete.
pub fn unset_update(path: PollFieldPath) -> Document {
    let path = match path {
        PollFieldPath::Participant(id) => format!("participants.{id}"),
        PollFieldPath::Nomination(id) => format!("nominations.{id}"),
    };
    let mut fields = Document::new();
    fields.insert(path, "");
    doc! { "$unset": fields }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn set_update_targets_dotted_paths() {
        let update = set_update(PollField::Participant {
            id: "u1".into(),
            name: "Ana".into(),
        });
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("participants.u1").unwrap(), "Ana");
    }

    #[test]
    fn unset_update_targets_dotted_paths() {
        let update = unset_update(PollFieldPath::Nomination("n1".into()));
        let unset = update.get_document("$unset").unwrap();
        assert!(unset.contains_key("nominations.n1"));
    }

    #[test]
    fn entity_round_trips_through_the_document_shape() {
        let mut poll = PollEntity::new(
            "AB12CD".into(),
            "lunch".into(),
            2,
            "admin".into(),
            Duration::from_secs(60),
        );
        poll.nominations.insert(
            "n1".into(),
            NominationEntity {
                user_id: "admin".into(),
                text: "tacos".into(),
            },
        );

        let document: MongoPollDocument = poll.clone().into();
        let back: PollEntity = document.into();

        assert_eq!(back.id, poll.id);
        assert_eq!(back.nominations, poll.nominations);
        // BSON DateTime has millisecond precision; compare at that granularity.
        assert!(
            back.expires_at
                .duration_since(poll.created_at)
                .unwrap()
                .as_secs()
                >= 59
        );
    }
}
