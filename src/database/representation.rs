use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::schema::{
    Id, RecipeIngredientRow, RecipeRow, RecipeShortRow, RecipeTagRow, Tag, UserRow,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl From<UserRow> for UserView {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            is_subscribed: row.is_subscribed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredientView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredientRow> for RecipeIngredientView {
    fn from(row: RecipeIngredientRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            measurement_unit: row.measurement_unit,
            amount: row.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeView {
    pub id: Id,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub tags: Vec<Tag>,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeView {
    pub fn assemble(
        row: RecipeRow,
        author: UserView,
        ingredients: Vec<RecipeIngredientRow>,
        tags: Vec<RecipeTagRow>,
    ) -> Self {
        Self {
            id: row.id,
            author,
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            tags: tags.into_iter().map(Into::into).collect(),
            name: row.name,
            image: row.image,
            text: row.text,
            cooking_time: row.cooking_time,
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
        }
    }
}

/// Compact form used by favourites, the cart and subscription listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeShortView {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<RecipeShortRow> for RecipeShortView {
    fn from(row: RecipeShortRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image: row.image,
            cooking_time: row.cooking_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserView,
    pub recipes_count: i64,
    pub recipes: Vec<RecipeShortView>,
}

impl SubscriptionView {
    /// `recipes` must already be newest first; `recipes_limit` keeps only
    /// the head of the list.
    pub fn assemble(
        author: UserView,
        recipes: Vec<RecipeShortRow>,
        recipes_limit: Option<usize>,
    ) -> Self {
        let recipes_count = recipes.len() as i64;
        let limit = recipes_limit.unwrap_or(recipes.len());
        Self {
            author,
            recipes_count,
            recipes: recipes.into_iter().take(limit).map(Into::into).collect(),
        }
    }
}

pub trait GroupKey {
    fn group_key(&self) -> Id;
}

impl GroupKey for RecipeIngredientRow {
    fn group_key(&self) -> Id {
        self.recipe_id
    }
}

impl GroupKey for RecipeTagRow {
    fn group_key(&self) -> Id {
        self.recipe_id
    }
}

impl GroupKey for RecipeShortRow {
    fn group_key(&self) -> Id {
        self.author_id
    }
}

/// Buckets join rows by their owning key, preserving row order inside each
/// bucket.
pub fn group_by_key<T: GroupKey>(rows: Vec<T>) -> HashMap<Id, Vec<T>> {
    let mut map: HashMap<Id, Vec<T>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| map.entry(row.group_key()).or_default().push(row));
    map
}
