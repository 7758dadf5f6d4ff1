use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::app::{EstuaryError, Result};

/// Pagination cursor for topic listings.
///
/// Ordering is newest-first: descending by `receive_date`, with `topic_id`
/// as a lexicographic ascending tie-break. Backends that bucket "last
/// bumped" time to coarse granularity routinely produce equal timestamps,
/// so the tie-break is part of the contract, not a nicety.
///
/// Serializes as `"<receive_date>:<topic_id>"`. Cursors cross storage and
/// process boundaries, so `decode(encode(k)) == k` is a hard contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicKey {
    pub receive_date: i64,
    pub topic_id: String,
}

impl TopicKey {
    pub fn new(receive_date: i64, topic_id: impl Into<String>) -> Self {
        Self {
            receive_date,
            topic_id: topic_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}", self.receive_date, self.topic_id)
    }

    pub fn decode(s: &str) -> Result<Self> {
        let (date, id) = split_cursor(s)?;
        Ok(Self {
            receive_date: date,
            topic_id: id.to_string(),
        })
    }
}

impl Ord for TopicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .receive_date
            .cmp(&self.receive_date)
            .then_with(|| self.topic_id.cmp(&other.topic_id))
    }
}

impl PartialOrd for TopicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pagination cursor for reply listings.
///
/// Ordering is ascending by `floor`, tie-break ascending by `id`.
/// Same `"<floor>:<id>"` serialization contract as [`TopicKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentKey {
    pub floor: i64,
    pub id: String,
}

impl CommentKey {
    pub fn new(floor: i64, id: impl Into<String>) -> Self {
        Self {
            floor,
            id: id.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}", self.floor, self.id)
    }

    pub fn decode(s: &str) -> Result<Self> {
        let (floor, id) = split_cursor(s)?;
        Ok(Self {
            floor,
            id: id.to_string(),
        })
    }
}

impl Ord for CommentKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.floor
            .cmp(&other.floor)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for CommentKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split `"<i64>:<id>"`. Colon is the sole delimiter; ids are assumed to be
/// numeric-or-opaque tokens without colons, so a second colon in the
/// secondary part is rejected rather than absorbed.
fn split_cursor(s: &str) -> Result<(i64, &str)> {
    let (primary, secondary) = s
        .split_once(':')
        .ok_or_else(|| EstuaryError::MalformedCursor(format!("missing delimiter in {s:?}")))?;

    let value: i64 = primary
        .parse()
        .map_err(|_| EstuaryError::MalformedCursor(format!("non-numeric primary in {s:?}")))?;

    if secondary.is_empty() {
        return Err(EstuaryError::MalformedCursor(format!(
            "empty secondary in {s:?}"
        )));
    }
    if secondary.contains(':') {
        return Err(EstuaryError::MalformedCursor(format!(
            "stray delimiter in {s:?}"
        )));
    }

    Ok((value, secondary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_key_round_trip() {
        for key in [
            TopicKey::new(1700000000000, "12345"),
            TopicKey::new(0, "a"),
            TopicKey::new(-1, "tok3n"),
            TopicKey::new(i64::MAX, "x"),
        ] {
            assert_eq!(TopicKey::decode(&key.encode()).unwrap(), key);
        }
    }

    #[test]
    fn test_comment_key_round_trip() {
        for key in [
            CommentKey::new(1, "r100"),
            CommentKey::new(9999, "0"),
            CommentKey::new(i64::MIN, "z"),
        ] {
            assert_eq!(CommentKey::decode(&key.encode()).unwrap(), key);
        }
    }

    #[test]
    fn test_decode_malformed() {
        for bad in ["", "12345", ":", "12345:", "abc:def", "1:2:3", "1.5:x"] {
            assert!(
                matches!(
                    TopicKey::decode(bad),
                    Err(EstuaryError::MalformedCursor(_))
                ),
                "expected MalformedCursor for {bad:?}"
            );
        }
    }

    #[test]
    fn test_topic_ordering_newest_first() {
        let newer = TopicKey::new(2000, "1");
        let older = TopicKey::new(1000, "1");
        assert!(newer < older);
    }

    #[test]
    fn test_topic_tie_break_by_id_only() {
        let a = TopicKey::new(1000, "100");
        let b = TopicKey::new(1000, "200");
        assert!(a < b);
        assert_eq!(a.cmp(&a.clone()), std::cmp::Ordering::Equal);
    }

    #[test]
    fn test_comment_ordering_ascending() {
        let first = CommentKey::new(1, "a");
        let second = CommentKey::new(2, "a");
        assert!(first < second);

        let tie_a = CommentKey::new(5, "r1");
        let tie_b = CommentKey::new(5, "r2");
        assert!(tie_a < tie_b);
    }

    #[test]
    fn test_encode_format() {
        assert_eq!(TopicKey::new(42, "abc").encode(), "42:abc");
        assert_eq!(CommentKey::new(-7, "x").encode(), "-7:x");
    }
}
