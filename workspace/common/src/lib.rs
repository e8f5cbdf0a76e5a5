//! Common transport-layer types shared between the compute crate and the HTTP layer.
//! The shopping list produced by the aggregation engine is serialized as-is by the
//! backend handlers, so its shape lives here once.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One ingredient entry of a recipe composition: ingredient id plus required amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct IngredientAmount {
    /// Ingredient ID
    pub id: i32,
    /// Required amount, in the ingredient's measurement unit
    pub amount: i32,
}

/// One aggregated line of a shopping list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ShoppingListItem {
    /// Ingredient ID (the grouping key)
    pub ingredient_id: i32,
    /// Ingredient name
    pub name: String,
    /// Measurement unit
    pub measurement_unit: String,
    /// Sum of the amounts required by every recipe in the cart
    pub total_amount: i64,
}

/// A recipe currently sitting in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CartRecipe {
    pub id: i32,
    pub name: String,
}

/// The aggregated content of a cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ShoppingList {
    /// Recipes in the cart, ordered by name
    pub recipes: Vec<CartRecipe>,
    /// Ingredient totals, ordered by name then unit
    pub ingredients: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shopping_list_serializes_with_snake_case_fields() {
        let list = ShoppingList {
            recipes: vec![CartRecipe {
                id: 1,
                name: "Блины".to_string(),
            }],
            ingredients: vec![ShoppingListItem {
                ingredient_id: 3,
                name: "мука".to_string(),
                measurement_unit: "г".to_string(),
                total_amount: 200,
            }],
        };

        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(value["recipes"][0]["name"], "Блины");
        assert_eq!(value["ingredients"][0]["measurement_unit"], "г");
        assert_eq!(value["ingredients"][0]["total_amount"], 200);
    }

    #[test]
    fn ingredient_amount_deserializes_from_request_shape() {
        let parsed: Vec<IngredientAmount> =
            serde_json::from_str(r#"[{"id": 4, "amount": 10}, {"id": 5, "amount": 1}]"#).unwrap();
        assert_eq!(parsed, vec![
            IngredientAmount { id: 4, amount: 10 },
            IngredientAmount { id: 5, amount: 1 },
        ]);
    }

    #[test]
    fn empty_list_is_empty() {
        assert!(ShoppingList::default().is_empty());
    }
}
