use common::IngredientAmount;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, instrument};

/// Violations of the recipe composition rules.
///
/// Tags and ingredients of a recipe are sets: each list must be non-empty and
/// must not repeat an id. Repeating an ingredient with a different amount is a
/// duplicate as well.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("at least one tag is required")]
    EmptyTags,

    #[error("at least one ingredient is required")]
    EmptyIngredients,

    #[error("tag {0} is listed more than once")]
    DuplicateTag(i32),

    #[error("ingredient {0} is listed more than once")]
    DuplicateIngredient(i32),

    #[error("amount of ingredient {ingredient_id} must be positive, got {amount}")]
    NonPositiveAmount { ingredient_id: i32, amount: i32 },
}

impl CompositionError {
    /// Request field the error concerns.
    pub fn field(&self) -> &'static str {
        match self {
            CompositionError::EmptyTags | CompositionError::DuplicateTag(_) => "tags",
            CompositionError::EmptyIngredients
            | CompositionError::DuplicateIngredient(_)
            | CompositionError::NonPositiveAmount { .. } => "ingredients",
        }
    }
}

/// Checks the tag and ingredient lists of a recipe before anything is written.
///
/// Tags are checked first; the first violation found is returned.
#[instrument(skip_all, fields(tags = tag_ids.len(), ingredients = ingredients.len()))]
pub fn validate_composition(
    tag_ids: &[i32],
    ingredients: &[IngredientAmount],
) -> Result<(), CompositionError> {
    if tag_ids.is_empty() {
        return Err(CompositionError::EmptyTags);
    }
    let mut seen_tags = HashSet::with_capacity(tag_ids.len());
    for &tag_id in tag_ids {
        if !seen_tags.insert(tag_id) {
            debug!(tag_id, "Duplicate tag in composition");
            return Err(CompositionError::DuplicateTag(tag_id));
        }
    }

    if ingredients.is_empty() {
        return Err(CompositionError::EmptyIngredients);
    }
    let mut seen_ingredients = HashSet::with_capacity(ingredients.len());
    for entry in ingredients {
        if entry.amount <= 0 {
            return Err(CompositionError::NonPositiveAmount {
                ingredient_id: entry.id,
                amount: entry.amount,
            });
        }
        if !seen_ingredients.insert(entry.id) {
            debug!(ingredient_id = entry.id, "Duplicate ingredient in composition");
            return Err(CompositionError::DuplicateIngredient(entry.id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ia(id: i32, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    #[test]
    fn accepts_valid_composition() {
        assert_eq!(validate_composition(&[1, 2], &[ia(1, 200), ia(2, 1)]), Ok(()));
    }

    #[test]
    fn rejects_empty_sets() {
        assert_eq!(
            validate_composition(&[], &[ia(1, 1)]),
            Err(CompositionError::EmptyTags)
        );
        assert_eq!(
            validate_composition(&[1], &[]),
            Err(CompositionError::EmptyIngredients)
        );
    }

    #[test]
    fn rejects_duplicate_tag() {
        let err = validate_composition(&[3, 1, 3], &[ia(1, 1)]).unwrap_err();
        assert_eq!(err, CompositionError::DuplicateTag(3));
        assert_eq!(err.field(), "tags");
    }

    #[test]
    fn rejects_same_ingredient_with_different_amounts() {
        let err = validate_composition(&[1], &[ia(7, 100), ia(8, 2), ia(7, 50)]).unwrap_err();
        assert_eq!(err, CompositionError::DuplicateIngredient(7));
        assert_eq!(err.field(), "ingredients");
    }

    #[test]
    fn rejects_non_positive_amount() {
        assert_eq!(
            validate_composition(&[1], &[ia(1, 0)]),
            Err(CompositionError::NonPositiveAmount {
                ingredient_id: 1,
                amount: 0
            })
        );
        assert!(validate_composition(&[1], &[ia(1, -5)]).is_err());
    }
}
