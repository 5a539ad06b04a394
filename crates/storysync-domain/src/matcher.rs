//! Locate the board item a parsed story corresponds to.

use crate::board::{Board, BoardItem};

/// Content-id prefix of items created by a corrupt test fixture that once
/// leaked onto real boards. Anything carrying it must never match.
const CORRUPT_FIXTURE_ID_PREFIX: &str = "DI_lAHOBFSaJM4BEcZZzgJ0";

/// Find the existing item a story corresponds to, or None.
///
/// Strict priority order, first hit in board traversal order wins:
/// 1. exact story-id equality
/// 2. exact url equality (when the story has a linked issue/PR url)
/// 3. case-insensitive, trimmed title equality after stripping a leading
///    `Story:` prefix from both sides
///
/// No fuzzy matching beyond this.
pub fn find_item<'a>(
    board: &'a Board,
    story_id: Option<&str>,
    url: Option<&str>,
    title: &str,
) -> Option<&'a BoardItem> {
    let candidates = || {
        board
            .items()
            .filter(|item| !item.content_id.is_empty())
            .filter(|item| !item.content_id.starts_with(CORRUPT_FIXTURE_ID_PREFIX))
    };

    if let Some(story_id) = story_id {
        if let Some(item) = candidates().find(|item| item.story_id.as_deref() == Some(story_id)) {
            return Some(item);
        }
    }

    if let Some(url) = url {
        if let Some(item) = candidates().find(|item| item.url.as_deref() == Some(url)) {
            return Some(item);
        }
    }

    let wanted = comparable_title(title);
    candidates().find(|item| comparable_title(&item.title) == wanted)
}

fn comparable_title(title: &str) -> String {
    let trimmed = title.trim();
    let rest = trimmed
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("story:"))
        .map(|_| trimmed[6..].trim())
        .unwrap_or(trimmed);
    rest.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardColumn, ItemKind, ItemState};

    fn item(content_id: &str, title: &str, story_id: Option<&str>, url: Option<&str>) -> BoardItem {
        BoardItem {
            kind: ItemKind::DraftIssue,
            content_id: content_id.to_string(),
            board_item_id: format!("PVTI_{content_id}"),
            title: title.to_string(),
            url: url.map(str::to_string),
            body: String::new(),
            state: ItemState::Open,
            story_id: story_id.map(str::to_string),
            status: "Backlog".to_string(),
        }
    }

    fn board(items: Vec<BoardItem>) -> Board {
        Board {
            id: "PROJ_1".to_string(),
            name: "Board".to_string(),
            columns: vec![BoardColumn {
                id: "col-1".to_string(),
                name: "Backlog".to_string(),
                items,
            }],
            status_field: None,
            story_id_field: None,
        }
    }

    #[test]
    fn test_story_id_wins_over_title() {
        let board = board(vec![
            item("DI_1", "Exact title", None, None),
            item("DI_2", "Completely different", Some("S-1"), None),
        ]);
        let found = find_item(&board, Some("S-1"), None, "Exact title").unwrap();
        assert_eq!(found.content_id, "DI_2");
    }

    #[test]
    fn test_url_beats_title() {
        let board = board(vec![
            item("DI_1", "Same title", None, None),
            item("DI_2", "Other", None, Some("https://example.com/issues/9")),
        ]);
        let found = find_item(
            &board,
            None,
            Some("https://example.com/issues/9"),
            "Same title",
        )
        .unwrap();
        assert_eq!(found.content_id, "DI_2");
    }

    #[test]
    fn test_title_match_is_case_insensitive_and_strips_prefix() {
        let board = board(vec![item("DI_1", "Story:  Fix the Parser ", None, None)]);
        let found = find_item(&board, None, None, "fix the parser").unwrap();
        assert_eq!(found.content_id, "DI_1");
    }

    #[test]
    fn test_first_match_in_traversal_order_wins() {
        let board = board(vec![
            item("DI_1", "Duplicate", None, None),
            item("DI_2", "Duplicate", None, None),
        ]);
        let found = find_item(&board, None, None, "Duplicate").unwrap();
        assert_eq!(found.content_id, "DI_1");
    }

    #[test]
    fn test_corrupt_fixture_ids_never_match() {
        let poisoned = format!("{CORRUPT_FIXTURE_ID_PREFIX}abc");
        let board = board(vec![item(&poisoned, "Poisoned", Some("S-9"), None)]);
        assert!(find_item(&board, Some("S-9"), None, "Poisoned").is_none());
    }

    #[test]
    fn test_no_match_returns_none() {
        let board = board(vec![item("DI_1", "Something", Some("S-1"), None)]);
        assert!(find_item(&board, Some("S-2"), None, "Else").is_none());
    }
}
