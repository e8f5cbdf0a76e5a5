//! Domain logic of the recipe backend that is independent of the HTTP layer:
//! shopping cart aggregation and rendering, recipe composition rules and
//! tag normalisation.

pub mod error;
pub mod recipe;
pub mod render;
pub mod shopping_cart;
pub mod tags;

pub use error::{ComputeError, Result};
pub use recipe::{CompositionError, validate_composition};
pub use render::ShoppingListDocument;
pub use shopping_cart::{IngredientLine, ShoppingCartComputer};
