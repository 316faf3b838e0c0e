use potion::HtmlError;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{not_found, QueryError},
    jwt::SessionData,
    representation::RecipeShortView,
    schema::{CartPart, Id, RecipeShortRow},
    shopping::list::ShoppingList,
};

/// Per-user recipe sets backed by a `(user_id, recipe_id)` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn label(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping cart",
        }
    }
}

pub async fn is_in_list(
    list: RecipeList,
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let result: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE recipe_id = $1 AND user_id = $2",
        list.table()
    ))
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.is_some())
}

pub async fn add_to_list(
    list: RecipeList,
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeShortView, potion::Error> {
    session.authenticate(ActionType::ManageOwnLists)?;

    let recipe: Option<RecipeShortRow> = sqlx::query_as(
        "SELECT author_id, id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;
    let recipe = recipe.ok_or_else(|| not_found("No recipe exists with specified id"))?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        list.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(&format!(
            "Recipe is already in {}",
            list.label()
        )));
    }

    log::debug!(
        "user {} added recipe {recipe_id} to {}",
        session.user_id,
        list.label()
    );
    Ok(recipe.into())
}

pub async fn remove_from_list(
    list: RecipeList,
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnLists)?;

    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    ))
    .bind(session.user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(&format!(
            "Recipe is not in {}",
            list.label()
        )));
    }

    Ok(())
}

pub async fn is_favorite(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    is_in_list(RecipeList::Favorites, recipe_id, user_id, pool).await
}

pub async fn add_to_favorites(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeShortView, potion::Error> {
    add_to_list(RecipeList::Favorites, recipe_id, session, pool).await
}

pub async fn remove_from_favorites(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_from_list(RecipeList::Favorites, recipe_id, session, pool).await
}

pub async fn is_in_shopping_cart(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    is_in_list(RecipeList::ShoppingCart, recipe_id, user_id, pool).await
}

pub async fn add_to_shopping_cart(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeShortView, potion::Error> {
    add_to_list(RecipeList::ShoppingCart, recipe_id, session, pool).await
}

pub async fn remove_from_shopping_cart(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_from_list(RecipeList::ShoppingCart, recipe_id, session, pool).await
}

/// Every ingredient line of every recipe in the user's cart.
pub async fn list_shopping_cart_parts(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartPart>, potion::Error> {
    let rows: Vec<CartPart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn download_shopping_list(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, potion::Error> {
    session.authenticate(ActionType::ManageOwnLists)?;
    let parts = list_shopping_cart_parts(session.user_id, pool).await?;

    log::debug!(
        "aggregating {} cart lines for user {}",
        parts.len(),
        session.user_id
    );
    Ok(ShoppingList::from_parts(parts))
}
