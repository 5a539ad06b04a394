pub mod board;
pub mod export;
pub mod idgen;
pub mod markdown;
pub mod matcher;
pub mod parser;
pub mod planner;
pub mod status;
pub mod story;

pub use board::{
    Board, BoardColumn, BoardFetch, BoardItem, ItemKind, ItemState, StatusField, TextField,
};
pub use export::{file_name_for, StoryExporter};
pub use idgen::{deterministic_id, suggest_ids, IdPatch};
pub use markdown::{CommonMark, Heading, MarkdownSurface};
pub use matcher::find_item;
pub use parser::{is_story_file, ParseOutcome, StoryParser};
pub use planner::{plan, ItemRef, MutationIntent};
pub use status::{normalize_status, StatusAliasTable};
pub use story::{ParsedStory, SourceLocation, StoryStatus};
