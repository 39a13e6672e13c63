use serde::{Deserialize, Serialize};

use crate::schema::{ingredients, recipe_ingredients, recipe_tags, recipes, tags, users};

#[derive(Debug, Clone, Queryable)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub token: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Insertable)]
#[table_name = "users"]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub is_active: bool,
}

#[derive(Debug, Default, AsChangeset)]
#[table_name = "users"]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.password_hash.is_none()
    }
}

/// A tag or an ingredient. Both tables share the same shape.
#[derive(Debug, Clone, PartialEq, Queryable, Serialize)]
pub struct Label {
    pub id: i32,
    #[serde(skip_serializing)]
    pub user_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Tag,
    Ingredient,
}

impl LabelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelKind::Tag => "tag",
            LabelKind::Ingredient => "ingredient",
        }
    }
}

#[derive(Debug, Insertable)]
#[table_name = "tags"]
pub struct NewTag<'a> {
    pub user_id: i32,
    pub name: &'a str,
}

#[derive(Debug, Insertable)]
#[table_name = "ingredients"]
pub struct NewIngredient<'a> {
    pub user_id: i32,
    pub name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct Recipe {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: f64,
    pub link: String,
}

#[derive(Debug, Insertable)]
#[table_name = "recipes"]
pub struct NewRecipe<'a> {
    pub user_id: i32,
    pub title: &'a str,
    pub description: &'a str,
    pub time_minutes: i32,
    pub price: f64,
    pub link: &'a str,
}

#[derive(Debug, Default, AsChangeset)]
#[table_name = "recipes"]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<f64>,
    pub link: Option<String>,
}

impl RecipeChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.time_minutes.is_none()
            && self.price.is_none()
            && self.link.is_none()
    }
}

// join rows, pair <recipe, label>
#[derive(Debug, Insertable)]
#[table_name = "recipe_tags"]
pub struct RecipeTag {
    pub recipe_id: i32,
    pub tag_id: i32,
}

#[derive(Debug, Insertable)]
#[table_name = "recipe_ingredients"]
pub struct RecipeIngredient {
    pub recipe_id: i32,
    pub ingredient_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<f64>,
    pub link: Option<String>,
    pub tags: Option<Vec<i32>>,
    pub ingredients: Option<Vec<i32>>,
}

/// Recipe as shown in list responses: related objects by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    pub price: f64,
    pub link: String,
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

impl RecipeSummary {
    pub(crate) fn encode_list(recipes: &[RecipeSummary]) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(recipes)
    }

    pub(crate) fn decode_list(bytes: &[u8]) -> Result<Vec<RecipeSummary>, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: f64,
    pub link: String,
    pub tags: Vec<Label>,
    pub ingredients: Vec<Label>,
}

impl RecipeDetail {
    pub fn new(recipe: Recipe, tags: Vec<Label>, ingredients: Vec<Label>) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            description: recipe.description,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            tags,
            ingredients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_list_survives_cache_encoding() {
        let recipes = vec![RecipeSummary {
            id: 3,
            title: "Pad Thai".to_string(),
            time_minutes: 25,
            price: 8.5,
            link: String::new(),
            tags: vec![1, 2],
            ingredients: vec![4],
        }];
        let bytes = RecipeSummary::encode_list(&recipes).unwrap();
        assert_eq!(RecipeSummary::decode_list(&bytes).unwrap(), recipes);
    }

    #[test]
    fn empty_changesets_are_detected() {
        assert!(UserChanges::default().is_empty());
        assert!(RecipeChanges::default().is_empty());
        let changes = RecipeChanges {
            price: Some(1.0),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn label_hides_owner_when_serialized() {
        let label = Label {
            id: 1,
            user_id: 9,
            name: "Vegan".to_string(),
        };
        let value = serde_json::to_value(&label).unwrap();
        assert_eq!(value, serde_json::json!({"id": 1, "name": "Vegan"}));
    }
}
