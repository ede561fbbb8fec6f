pub mod item;

pub use item::{ContentItem, ItemKey};
