//! Recommendation ordering over the library.
//!
//! Most-played tracks first, computed fresh from the store on every view
//! refresh. There is no cached ranking state to keep consistent.

use crate::library::Track;

/// Sort tracks by play count, descending.
///
/// The sort is stable, so tracks with equal counts keep the order they came
/// in with. Fed with [`crate::library::Library::list_all`] output that means
/// insertion order, and newly added zero-play tracks stay in a
/// deterministic place.
pub fn rank(mut tracks: Vec<Track>) -> Vec<Track> {
    tracks.sort_by(|a, b| b.play_count.cmp(&a.play_count));
    tracks
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::library::Track;

    use super::rank;

    fn track(id: i64, title: &str, play_count: u64) -> Track {
        Track {
            id,
            path: PathBuf::from(format!("/music/{title}.mp3")),
            title: title.to_string(),
            play_count,
            duration: None,
        }
    }

    fn titles(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn most_played_first_with_insertion_order_tie_break() {
        let ranked = rank(vec![track(1, "a", 2), track(2, "b", 5), track(3, "c", 2)]);
        assert_eq!(titles(&ranked), ["b", "a", "c"]);
    }

    #[test]
    fn all_zero_counts_keep_insertion_order() {
        let ranked = rank(vec![track(1, "z", 0), track(2, "a", 0), track(3, "m", 0)]);
        assert_eq!(titles(&ranked), ["z", "a", "m"]);
    }

    #[test]
    fn empty_library_ranks_to_empty() {
        assert!(rank(Vec::new()).is_empty());
    }
}
