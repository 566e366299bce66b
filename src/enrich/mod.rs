pub mod php;
pub mod recipe;
pub mod taxonomy;

pub use recipe::{resolve_recipe, RecipeBlock, RecipeExport};
pub use taxonomy::{resolve_categories, resolve_tags, CategoryRef, CategoryTable, TermTable};
