//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the recipe sharing application here:
//! users and their subscriptions, the tag and ingredient dictionaries,
//! recipes with their links, favorites and shopping carts.

pub mod cart;
pub mod cart_item;
pub mod favorite_recipe;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod subscription;
pub mod tag;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::cart::Entity as Cart;
    pub use super::cart_item::Entity as CartItem;
    pub use super::favorite_recipe::Entity as FavoriteRecipe;
    pub use super::ingredient::Entity as Ingredient;
    pub use super::recipe::Entity as Recipe;
    pub use super::recipe_ingredient::Entity as RecipeIngredient;
    pub use super::recipe_tag::Entity as RecipeTag;
    pub use super::subscription::Entity as Subscription;
    pub use super::tag::Entity as Tag;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn create_user(db: &DatabaseConnection, username: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{username}@example.com")),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    async fn create_recipe(
        db: &DatabaseConnection,
        author_id: i32,
        name: &str,
    ) -> Result<recipe::Model, DbErr> {
        recipe::ActiveModel {
            author_id: Set(author_id),
            name: Set(name.to_string()),
            text: Set("Mix and cook.".to_string()),
            cooking_time: Set(10),
            image: Set(String::new()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let author = create_user(&db, "chef").await?;

        let tag = tag::ActiveModel {
            name: Set("Breakfast".to_string()),
            color: Set("#E26C2D".to_string()),
            slug: Set("breakfast".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let flour = ingredient::ActiveModel {
            name: Set("flour".to_string()),
            measurement_unit: Set("g".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let pancakes = create_recipe(&db, author.id, "Pancakes").await?;

        recipe_tag::ActiveModel {
            recipe_id: Set(pancakes.id),
            tag_id: Set(tag.id),
        }
        .insert(&db)
        .await?;

        recipe_ingredient::ActiveModel {
            recipe_id: Set(pancakes.id),
            ingredient_id: Set(flour.id),
            amount: Set(200),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let tags = pancakes.find_related(Tag).all(&db).await?;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "breakfast");

        let ingredients = pancakes.find_related(Ingredient).all(&db).await?;
        assert_eq!(ingredients, vec![flour.clone()]);

        let lines = RecipeIngredient::find()
            .filter(recipe_ingredient::Column::RecipeId.eq(pancakes.id))
            .find_also_related(Ingredient)
            .all(&db)
            .await?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0.amount, 200);
        assert_eq!(lines[0].1.as_ref().map(|i| i.id), Some(flour.id));

        // Deleting a recipe cascades to its links.
        pancakes.delete(&db).await?;
        assert_eq!(RecipeTag::find().count(&db).await?, 0);
        assert_eq!(RecipeIngredient::find().count(&db).await?, 0);
        // The dictionaries are untouched.
        assert_eq!(Tag::find().count(&db).await?, 1);
        assert_eq!(Ingredient::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_cart_item_is_unique_per_recipe() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let user = create_user(&db, "shopper").await?;
        let recipe = create_recipe(&db, user.id, "Omelette").await?;

        let cart = cart::ActiveModel {
            user_id: Set(user.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        cart_item::ActiveModel {
            cart_id: Set(cart.id),
            recipe_id: Set(recipe.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let duplicate = cart_item::ActiveModel {
            cart_id: Set(cart.id),
            recipe_id: Set(recipe.id),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(duplicate.is_err());
        assert_eq!(CartItem::find().count(&db).await?, 1);

        let second_cart = cart::ActiveModel {
            user_id: Set(user.id),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(second_cart.is_err(), "a user owns at most one cart");

        Ok(())
    }

    #[tokio::test]
    async fn test_ingredient_in_use_cannot_be_deleted() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let user = create_user(&db, "baker").await?;
        let recipe = create_recipe(&db, user.id, "Bread").await?;
        let yeast = ingredient::ActiveModel {
            name: Set("yeast".to_string()),
            measurement_unit: Set("g".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe.id),
            ingredient_id: Set(yeast.id),
            amount: Set(7),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        assert!(yeast.clone().delete(&db).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected_by_schema() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let user = create_user(&db, "cook").await?;
        let recipe = create_recipe(&db, user.id, "Soup").await?;
        let salt = ingredient::ActiveModel {
            name: Set("salt".to_string()),
            measurement_unit: Set("g".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let zero = recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe.id),
            ingredient_id: Set(salt.id),
            amount: Set(0),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(zero.is_err());
        Ok(())
    }
}
