use common::{CartRecipe, ShoppingList, ShoppingListItem};
use model::entities::{cart, cart_item, ingredient, recipe, recipe_ingredient};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;

/// One ingredient requirement of one recipe in the cart, already joined with
/// the ingredient's name and unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientLine {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A computer that turns the content of a cart into a shopping list.
///
/// Every ingredient line of every recipe in the cart is grouped by ingredient
/// identity (its row id, so equal names with different units stay apart) and
/// the amounts are summed. Nothing is written back to storage.
#[derive(Debug)]
pub struct ShoppingCartComputer;

impl ShoppingCartComputer {
    /// Creates a new ShoppingCartComputer instance.
    pub fn new() -> Self {
        Self
    }

    /// Groups lines by ingredient id and sums their amounts.
    ///
    /// The output is sorted by name, then unit, then id, so the same cart
    /// always yields the same list whatever order the lines arrive in.
    pub fn aggregate<I>(&self, lines: I) -> Vec<ShoppingListItem>
    where
        I: IntoIterator<Item = IngredientLine>,
    {
        let mut totals: HashMap<i32, ShoppingListItem> = HashMap::new();

        for line in lines {
            totals
                .entry(line.ingredient_id)
                .and_modify(|item| item.total_amount += i64::from(line.amount))
                .or_insert_with(|| ShoppingListItem {
                    ingredient_id: line.ingredient_id,
                    name: line.name,
                    measurement_unit: line.measurement_unit,
                    total_amount: i64::from(line.amount),
                });
        }

        let mut items: Vec<ShoppingListItem> = totals.into_values().collect();
        items.sort_by(|a, b| {
            (&a.name, &a.measurement_unit, a.ingredient_id).cmp(&(
                &b.name,
                &b.measurement_unit,
                b.ingredient_id,
            ))
        });
        items
    }

    /// Loads the ingredient lines of every recipe referenced by the cart.
    #[instrument(skip(self, db))]
    pub async fn load_lines<C: ConnectionTrait>(
        &self,
        db: &C,
        recipe_ids: &[i32],
    ) -> Result<Vec<IngredientLine>> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.iter().copied()))
            .find_also_related(ingredient::Entity)
            .all(db)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for (link, ingredient) in rows {
            match ingredient {
                Some(ingredient) => lines.push(IngredientLine {
                    recipe_id: link.recipe_id,
                    ingredient_id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: link.amount,
                }),
                None => warn!(
                    recipe_id = link.recipe_id,
                    ingredient_id = link.ingredient_id,
                    "Recipe ingredient points to a missing ingredient, skipping"
                ),
            }
        }

        debug!("Loaded {} ingredient lines", lines.len());
        Ok(lines)
    }

    /// Computes the shopping list of one cart: its recipes and the summed
    /// ingredient totals. An empty cart yields an empty list.
    #[instrument(skip(self, db))]
    pub async fn compute_shopping_list<C: ConnectionTrait>(
        &self,
        db: &C,
        cart_id: i32,
    ) -> Result<ShoppingList> {
        let recipe_ids: Vec<i32> = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(db)
            .await?
            .into_iter()
            .map(|item| item.recipe_id)
            .collect();

        if recipe_ids.is_empty() {
            info!(cart_id, "Cart is empty");
            return Ok(ShoppingList::default());
        }

        let recipes = recipe::Entity::find()
            .filter(recipe::Column::Id.is_in(recipe_ids.iter().copied()))
            .order_by_asc(recipe::Column::Name)
            .order_by_asc(recipe::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|r| CartRecipe {
                id: r.id,
                name: r.name,
            })
            .collect();

        let lines = self.load_lines(db, &recipe_ids).await?;
        let ingredients = self.aggregate(lines);

        info!(
            cart_id,
            recipes = recipe_ids.len(),
            ingredients = ingredients.len(),
            "Computed shopping list"
        );
        Ok(ShoppingList {
            recipes,
            ingredients,
        })
    }

    /// Same as [`Self::compute_shopping_list`], looking the cart up by its owner.
    /// A user who never touched the cart gets an empty list.
    #[instrument(skip(self, db))]
    pub async fn compute_for_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i32,
    ) -> Result<ShoppingList> {
        let cart = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(db)
            .await?;

        match cart {
            Some(cart) => self.compute_shopping_list(db, cart.id).await,
            None => {
                debug!(user_id, "User has no cart yet");
                Ok(ShoppingList::default())
            }
        }
    }
}

impl Default for ShoppingCartComputer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use model::entities::user;
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};

    fn line(recipe_id: i32, ingredient_id: i32, name: &str, unit: &str, amount: i32) -> IngredientLine {
        IngredientLine {
            recipe_id,
            ingredient_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn totals(items: &[ShoppingListItem]) -> Vec<(&str, &str, i64)> {
        items
            .iter()
            .map(|i| (i.name.as_str(), i.measurement_unit.as_str(), i.total_amount))
            .collect()
    }

    #[test]
    fn test_aggregate_sums_by_ingredient() {
        let computer = ShoppingCartComputer::new();
        let lines = vec![
            line(1, 10, "flour", "g", 200),
            line(1, 11, "milk", "ml", 100),
            line(2, 12, "egg", "pcs", 2),
            line(2, 11, "milk", "ml", 50),
        ];

        let items = computer.aggregate(lines);

        assert_eq!(
            totals(&items),
            vec![("egg", "pcs", 2), ("flour", "g", 200), ("milk", "ml", 150)]
        );
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let computer = ShoppingCartComputer::new();
        let lines = vec![
            line(1, 1, "sugar", "g", 30),
            line(2, 2, "salt", "g", 5),
            line(3, 1, "sugar", "g", 70),
            line(3, 2, "salt", "g", 1),
        ];
        let mut reversed = lines.clone();
        reversed.reverse();

        assert_eq!(computer.aggregate(lines), computer.aggregate(reversed));
    }

    #[test]
    fn test_aggregate_keeps_units_apart() {
        let computer = ShoppingCartComputer::new();
        let lines = vec![
            line(1, 1, "milk", "ml", 100),
            line(2, 2, "milk", "l", 1),
            line(3, 1, "milk", "ml", 20),
        ];

        let items = computer.aggregate(lines);

        assert_eq!(totals(&items), vec![("milk", "l", 1), ("milk", "ml", 120)]);
    }

    #[test]
    fn test_aggregate_empty() {
        let computer = ShoppingCartComputer::new();
        assert!(computer.aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn test_aggregate_does_not_overflow_i32() {
        let computer = ShoppingCartComputer::new();
        let lines = vec![
            line(1, 1, "rice", "g", i32::MAX),
            line(2, 1, "rice", "g", i32::MAX),
        ];

        let items = computer.aggregate(lines);

        assert_eq!(items[0].total_amount, 2 * i64::from(i32::MAX));
    }

    async fn setup_db() -> DatabaseConnection {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn insert_recipe(
        db: &DatabaseConnection,
        author_id: i32,
        name: &str,
        ingredients: &[(i32, i32)],
    ) -> recipe::Model {
        let recipe = recipe::ActiveModel {
            author_id: Set(author_id),
            name: Set(name.to_string()),
            text: Set("...".to_string()),
            cooking_time: Set(15),
            image: Set(String::new()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        for &(ingredient_id, amount) in ingredients {
            recipe_ingredient::ActiveModel {
                recipe_id: Set(recipe.id),
                ingredient_id: Set(ingredient_id),
                amount: Set(amount),
                ..Default::default()
            }
            .insert(db)
            .await
            .unwrap();
        }
        recipe
    }

    async fn insert_ingredient(db: &DatabaseConnection, name: &str, unit: &str) -> i32 {
        ingredient::ActiveModel {
            name: Set(name.to_string()),
            measurement_unit: Set(unit.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_compute_shopping_list_from_storage() {
        let db = setup_db().await;
        let user = user::ActiveModel {
            username: Set("cook".to_string()),
            email: Set("cook@example.com".to_string()),
            first_name: Set("Cook".to_string()),
            last_name: Set("Book".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let flour = insert_ingredient(&db, "flour", "g").await;
        let milk = insert_ingredient(&db, "milk", "ml").await;
        let egg = insert_ingredient(&db, "egg", "pcs").await;

        let pancakes = insert_recipe(&db, user.id, "Pancakes", &[(flour, 200), (milk, 100)]).await;
        let omelette = insert_recipe(&db, user.id, "Omelette", &[(egg, 2), (milk, 50)]).await;
        // Not in the cart; must not contribute.
        insert_recipe(&db, user.id, "Porridge", &[(milk, 300)]).await;
        let empty = insert_recipe(&db, user.id, "Water", &[]).await;

        let cart = cart::ActiveModel {
            user_id: Set(user.id),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let computer = ShoppingCartComputer::new();
        let list = computer.compute_shopping_list(&db, cart.id).await.unwrap();
        assert!(list.is_empty());
        assert!(list.ingredients.is_empty());

        for recipe_id in [pancakes.id, omelette.id, empty.id] {
            cart_item::ActiveModel {
                cart_id: Set(cart.id),
                recipe_id: Set(recipe_id),
                ..Default::default()
            }
            .insert(&db)
            .await
            .unwrap();
        }

        let list = computer.compute_for_user(&db, user.id).await.unwrap();

        let names: Vec<&str> = list.recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Omelette", "Pancakes", "Water"]);
        assert_eq!(
            totals(&list.ingredients),
            vec![("egg", "pcs", 2), ("flour", "g", 200), ("milk", "ml", 150)]
        );

        // Read-only: the cart content is untouched.
        let items = cart_item::Entity::find().all(&db).await.unwrap();
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_compute_for_user_without_cart() {
        let db = setup_db().await;
        let computer = ShoppingCartComputer::new();

        let list = computer.compute_for_user(&db, 42).await.unwrap();

        assert_eq!(list, ShoppingList::default());
    }
}
