//! Page rendering and HTML extraction.

pub mod browser;
pub mod levels;
pub mod table;

pub use browser::render_page;
pub use levels::{extract_level_slots, LevelSlot};
pub use table::RawTable;
