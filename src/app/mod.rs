pub mod editor;
pub mod summary;

pub use editor::EditSession;
pub use summary::{summarize, NoteSummary, NO_TEXT, UNTITLED};
