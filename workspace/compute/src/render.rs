use common::ShoppingList;

/// A shopping list rendered as a flat sequence of text lines, ready to be
/// sent as a downloadable attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListDocument {
    lines: Vec<String>,
}

impl ShoppingListDocument {
    pub const CONTENT_TYPE: &'static str = "text/plain; charset=utf-8";
    pub const FILE_NAME: &'static str = "shopping-cart.txt";

    /// Builds the document lines for `owner`.
    ///
    /// Layout: title, a cart summary line, one line per recipe and, when the
    /// cart is not empty, the ingredient totals. An empty cart renders the
    /// title and summary only.
    pub fn render(owner: &str, list: &ShoppingList) -> Self {
        let mut lines = Vec::with_capacity(list.recipes.len() + list.ingredients.len() + 5);
        lines.push(format!("Shopping list for {owner}"));
        lines.push(format!("Recipes in cart: {}", list.recipes.len()));

        for recipe in &list.recipes {
            lines.push(format!("  * {}", recipe.name));
        }

        if !list.ingredients.is_empty() {
            lines.push(String::new());
            lines.push("Ingredients:".to_string());
            for item in &list.ingredients {
                lines.push(format!(
                    "  - {} ({}): {}",
                    item.name, item.measurement_unit, item.total_amount
                ));
            }
        }

        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// UTF-8 body, one line per document line, newline terminated.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = self.lines.join("\n");
        body.push('\n');
        body.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CartRecipe, ShoppingListItem};

    #[test]
    fn renders_recipes_and_totals() {
        let list = ShoppingList {
            recipes: vec![
                CartRecipe { id: 2, name: "Omelette".to_string() },
                CartRecipe { id: 1, name: "Pancakes".to_string() },
            ],
            ingredients: vec![
                ShoppingListItem {
                    ingredient_id: 3,
                    name: "egg".to_string(),
                    measurement_unit: "pcs".to_string(),
                    total_amount: 2,
                },
                ShoppingListItem {
                    ingredient_id: 2,
                    name: "milk".to_string(),
                    measurement_unit: "ml".to_string(),
                    total_amount: 150,
                },
            ],
        };

        let doc = ShoppingListDocument::render("alice", &list);

        assert_eq!(
            doc.lines(),
            &[
                "Shopping list for alice",
                "Recipes in cart: 2",
                "  * Omelette",
                "  * Pancakes",
                "",
                "Ingredients:",
                "  - egg (pcs): 2",
                "  - milk (ml): 150",
            ]
        );
    }

    #[test]
    fn empty_cart_renders_header_only() {
        let doc = ShoppingListDocument::render("bob", &ShoppingList::default());

        assert_eq!(doc.lines(), &["Shopping list for bob", "Recipes in cart: 0"]);
        assert_eq!(doc.to_bytes(), b"Shopping list for bob\nRecipes in cart: 0\n".to_vec());
    }

    #[test]
    fn non_ascii_text_survives_encoding() {
        let list = ShoppingList {
            recipes: vec![CartRecipe { id: 1, name: "Сырники 🥞".to_string() }],
            ingredients: vec![ShoppingListItem {
                ingredient_id: 1,
                name: "творог".to_string(),
                measurement_unit: "г".to_string(),
                total_amount: 500,
            }],
        };

        let doc = ShoppingListDocument::render("Jürgen", &list);
        let text = String::from_utf8(doc.to_bytes()).unwrap();

        assert!(text.starts_with("Shopping list for Jürgen\n"));
        assert!(text.contains("  * Сырники 🥞\n"));
        assert!(text.ends_with("  - творог (г): 500\n"));
    }
}
