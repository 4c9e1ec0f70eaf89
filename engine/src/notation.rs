//! Best-move extraction from free-form engine output.
//!
//! The search module prints diagnostics interleaved with its answer; the
//! only contract is that a line somewhere contains `bestmove` followed by
//! a coordinate-move token. Everything here is pure text handling with no
//! board awareness.

/// Marker preceding the authoritative move token in engine output.
const BEST_MOVE_MARKER: &str = "bestmove";

/// Decomposed coordinate-move token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMove {
    pub origin: String,
    pub destination: String,
    pub promotion: Option<char>,
}

/// Scan free-form output for the first `bestmove <token>` occurrence.
///
/// Case-insensitive; the returned token is lowercased. First match wins:
/// engines print diagnostics before the answer and the authoritative
/// token is assumed to appear once and first. Returns `None` when no
/// recognizable token exists anywhere in the text (a no-result run, not
/// an error).
pub fn extract_best_move(raw: &str) -> Option<String> {
    let lowered = raw.to_ascii_lowercase();
    let mut remaining = lowered.as_str();
    while let Some(pos) = remaining.find(BEST_MOVE_MARKER) {
        let after = &remaining[pos + BEST_MOVE_MARKER.len()..];
        if after.starts_with(|c: char| c.is_whitespace()) {
            if let Some(token) = after.split_whitespace().next() {
                if is_coordinate_token(token) {
                    return Some(token.to_string());
                }
            }
        }
        remaining = after;
    }
    None
}

/// Strict shape check for a coordinate-move token:
/// file a-h, rank 1-8, file a-h, rank 1-8, optional promotion letter.
pub fn is_coordinate_token(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 4 && bytes.len() != 5 {
        return false;
    }
    let square_ok =
        |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
    if !square_ok(bytes[0], bytes[1]) || !square_ok(bytes[2], bytes[3]) {
        return false;
    }
    bytes.len() == 4 || matches!(bytes[4], b'q' | b'r' | b'b' | b'n')
}

/// Pure decomposition of a token into origin, destination and promotion.
/// Whether the move is playable is the board's business, not ours.
pub fn split_token(token: &str) -> Option<BestMove> {
    if !is_coordinate_token(token) {
        return None;
    }
    Some(BestMove {
        origin: token[0..2].to_string(),
        destination: token[2..4].to_string(),
        promotion: token.as_bytes().get(4).map(|&b| b as char),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_from_diagnostics() {
        let output = "info depth 4\nbestmove e7e8q ponder d8d7";
        assert_eq!(extract_best_move(output), Some("e7e8q".to_string()));
    }

    #[test]
    fn test_no_match_is_none() {
        assert_eq!(extract_best_move("no result here"), None);
        assert_eq!(extract_best_move(""), None);
        assert_eq!(extract_best_move("bestmove"), None);
        assert_eq!(extract_best_move("bestmove (none)"), None);
    }

    #[test]
    fn test_first_match_wins() {
        let output = "bestmove e2e4\nsome noise\nbestmove d2d4";
        assert_eq!(extract_best_move(output), Some("e2e4".to_string()));
    }

    #[test]
    fn test_skips_marker_without_token() {
        let output = "bestmove pending\nbestmove g8f6";
        assert_eq!(extract_best_move(output), Some("g8f6".to_string()));
    }

    #[test]
    fn test_case_insensitive_lowercased() {
        assert_eq!(
            extract_best_move("BestMove E2E4"),
            Some("e2e4".to_string())
        );
    }

    #[test]
    fn test_is_coordinate_token() {
        assert!(is_coordinate_token("e2e4"));
        assert!(is_coordinate_token("a7a8n"));
        assert!(!is_coordinate_token("e2e"));
        assert!(!is_coordinate_token("e2e4x"));
        assert!(!is_coordinate_token("e9e4"));
        assert!(!is_coordinate_token("e2e4qq"));
    }

    #[test]
    fn test_split_token() {
        assert_eq!(
            split_token("e7e8q"),
            Some(BestMove {
                origin: "e7".to_string(),
                destination: "e8".to_string(),
                promotion: Some('q'),
            })
        );
        assert_eq!(split_token("e2e4").unwrap().promotion, None);
        assert_eq!(split_token("bogus"), None);
    }
}
