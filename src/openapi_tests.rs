#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::OpenApi;
    use utoipa::openapi::{PathItemType, RefOr, schema::Schema};

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components should be generated");
        match components.schemas.get(name) {
            Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
            Some(_) => panic!("{name} should be an object schema"),
            None => panic!("{name} schema is missing"),
        }
    }

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        let components = openapi.components.as_ref().unwrap();
        for schema in [
            "ErrorResponse",
            "HealthResponse",
            "RecipeResponse",
            "ShoppingList",
            "ShoppingListItem",
            "IngredientAmount",
        ] {
            assert!(components.schemas.contains_key(schema), "missing schema {schema}");
        }

        assert!(serde_json::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let properties = object_properties("ErrorResponse");
        for key in ["error", "code", "field", "success"] {
            assert!(properties.iter().any(|p| p == key), "missing property {key}");
        }
    }

    #[test]
    fn test_shopping_list_item_schema_structure() {
        let properties = object_properties("ShoppingListItem");
        for key in ["ingredient_id", "name", "measurement_unit", "total_amount"] {
            assert!(properties.iter().any(|p| p == key), "missing property {key}");
        }
    }

    #[test]
    fn test_health_endpoint_documents_failure() {
        let openapi = ApiDoc::openapi();

        let health_path = openapi.paths.paths.get("/health").unwrap();
        let health_get = health_path.operations.get(&PathItemType::Get).unwrap();

        assert!(health_get.responses.responses.contains_key("200"));
        assert!(health_get.responses.responses.contains_key("500"));
    }

    #[test]
    fn test_recipe_and_cart_paths_are_documented() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        let recipe = paths.get("/api/v1/recipes/{recipe_id}").unwrap();
        for op in [PathItemType::Get, PathItemType::Put, PathItemType::Delete] {
            assert!(recipe.operations.contains_key(&op));
        }

        let cart = paths.get("/api/v1/recipes/shopping_cart").unwrap();
        assert!(cart.operations.contains_key(&PathItemType::Get));
        assert!(cart.operations.contains_key(&PathItemType::Delete));

        let download = paths.get("/api/v1/recipes/download_shopping_cart").unwrap();
        let download_get = download.operations.get(&PathItemType::Get).unwrap();
        assert!(download_get.responses.responses.contains_key("200"));
        assert!(download_get.responses.responses.contains_key("401"));
    }

    #[test]
    fn test_error_responses_reference_component_schema() {
        let openapi_json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
        assert!(openapi_json.contains("#/components/schemas/ErrorResponse"));
    }
}
