use potion::HtmlError;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    error::{not_found, QueryError},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    payload::RecipeDraft,
    representation::{group_by_key, RecipeView, UserView},
    schema::{Id, Recipe, RecipeRow},
};

use super::{
    ingredients::{ensure_ingredients_exist, list_recipe_ingredients, replace_recipe_ingredients},
    tags::{ensure_tags_exist, list_recipe_tags, replace_recipe_tags},
    users::list_user_views,
};

/// Query-string filters of the recipe listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Selected from `recipes r` joined with a one-row `v(viewer)` relation
/// holding the requesting user id (NULL for anonymous requests).
const RECIPE_COLUMNS: &str = "
    r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.pub_date,
    EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = v.viewer) AS is_favorited,
    EXISTS (SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = v.viewer) AS is_in_shopping_cart,
    COUNT(*) OVER() AS count
";

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as(
        "SELECT id, author_id, name, text, image, cooking_time, pub_date FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Admins may modify any recipe, everyone else only their own.
fn authorize_recipe(recipe: Option<Recipe>, session: &SessionData) -> Result<Recipe, potion::Error> {
    let recipe = recipe.ok_or_else(|| not_found("No recipe exists with specified id"))?;

    if recipe.author_id != session.user_id
        && session.authenticate(ActionType::ManageAllRecipes).is_err()
    {
        return Err(HtmlError::Unauthorized.default());
    }
    Ok(recipe)
}

/// Loads a recipe the session is allowed to modify: its own, or any recipe
/// for admins.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    authorize_recipe(get_recipe(id, pool).await?, session)
}

/// Same check as [`get_recipe_mut`], holding the row lock until the
/// surrounding transaction ends.
async fn lock_recipe_mut(
    id: Id,
    session: &SessionData,
    conn: &mut PgConnection,
) -> Result<Recipe, potion::Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let row: Option<Recipe> = sqlx::query_as(
        "SELECT id, author_id, name, text, image, cooking_time, pub_date FROM recipes WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    authorize_recipe(row, session)
}

pub async fn create_recipe(
    session: &SessionData,
    draft: RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    session.authenticate(ActionType::CreateRecipes)?;
    let image = draft.require_image()?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_tags_exist(draft.tags(), &mut tr).await?;
    ensure_ingredients_exist(&draft.ingredient_ids(), &mut tr).await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(session.user_id)
    .bind(draft.name())
    .bind(draft.text())
    .bind(image)
    .bind(draft.cooking_time())
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_ingredients(id.0, &draft, &mut tr).await?;
    replace_recipe_tags(id.0, &draft, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("user {} created recipe {}", session.user_id, id.0);
    get_recipe_view(id.0, Some(session.user_id), pool).await
}

/// Overwrites every field of the recipe; the stored image is kept when the
/// draft carries none.
pub async fn update_recipe(
    id: Id,
    session: &SessionData,
    draft: RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe = lock_recipe_mut(id, session, &mut tr).await?;
    ensure_tags_exist(draft.tags(), &mut tr).await?;
    ensure_ingredients_exist(&draft.ingredient_ids(), &mut tr).await?;

    sqlx::query(
        "
        UPDATE recipes
        SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(draft.name())
    .bind(draft.text())
    .bind(draft.cooking_time())
    .bind(draft.image())
    .bind(recipe.id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_ingredients(recipe.id, &draft, &mut tr).await?;
    replace_recipe_tags(recipe.id, &draft, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("user {} updated recipe {}", session.user_id, recipe.id);
    get_recipe_view(recipe.id, Some(session.user_id), pool).await
}

/// Join rows, favourites and cart entries go with the recipe through
/// `ON DELETE CASCADE`.
pub async fn delete_recipe(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe = lock_recipe_mut(id, session, &mut tr).await?;
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("user {} deleted recipe {}", session.user_id, recipe.id);
    Ok(())
}

pub async fn get_recipe_view(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let row: Option<RecipeRow> = sqlx::query_as(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r CROSS JOIN (SELECT $1::INTEGER AS viewer) v WHERE r.id = $2"
    ))
    .bind(viewer)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let row = row.ok_or_else(|| not_found("No recipe exists with specified id"))?;
    let mut views = assemble_views(vec![row], viewer, pool).await?;
    views
        .pop()
        .ok_or_else(|| not_found("No recipe exists with specified id"))
}

pub async fn list_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeView>, potion::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    builder.push(RECIPE_COLUMNS);
    builder.push(" FROM recipes r CROSS JOIN (SELECT ");
    builder.push_bind(viewer);
    builder.push("::INTEGER AS viewer) v WHERE TRUE");
    push_filters(&mut builder, filter, viewer.is_some());
    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let views = assemble_views(rows, viewer, pool).await?;

    log::trace!("> Listed {} of {total_count} recipes", views.len());
    Ok(Page::from_rows(views, total_count, page)?)
}

/// Favourite and cart filters only narrow the listing for a signed-in
/// viewer.
fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    filter: &'a RecipeFilter,
    has_viewer: bool,
) {
    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.as_slice())
            .push("))");
    }
    if filter.is_favorited && has_viewer {
        builder.push(
            " AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = v.viewer)",
        );
    }
    if filter.is_in_shopping_cart && has_viewer {
        builder.push(
            " AND EXISTS (SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = v.viewer)",
        );
    }
}

/// Batch-loads authors, ingredients and tags for a page of recipe rows and
/// stitches them into views, keeping the order of `rows`.
async fn assemble_views(
    rows: Vec<RecipeRow>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, potion::Error> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = rows.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<Id> = rows.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors = list_user_views(&author_ids, viewer, pool).await?;
    let mut ingredients = group_by_key(list_recipe_ingredients(&recipe_ids, pool).await?);
    let mut tags = group_by_key(list_recipe_tags(&recipe_ids, pool).await?);

    rows.into_iter()
        .map(|row| -> Result<RecipeView, potion::Error> {
            let author: UserView = authors
                .iter()
                .find(|a| a.id == row.author_id)
                .cloned()
                .ok_or_else(|| not_found("Recipe author no longer exists"))?;
            let ingredients = ingredients.remove(&row.id).unwrap_or_default();
            let tags = tags.remove(&row.id).unwrap_or_default();
            Ok(RecipeView::assemble(row, author, ingredients, tags))
        })
        .collect()
}
