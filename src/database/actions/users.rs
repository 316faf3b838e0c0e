use potion::HtmlError;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::{not_found, QueryError},
    jwt::SessionData,
    pagination::{Page, PageRequest},
    representation::{group_by_key, SubscriptionView, UserView},
    schema::{Id, RecipeShortRow, User, UserRow},
};

/// Selected from `users u` joined with a one-row `v(viewer)` relation.
const USER_COLUMNS: &str = "
    u.id, u.email, u.username, u.first_name, u.last_name,
    EXISTS (SELECT 1 FROM subscriptions s WHERE s.author_id = u.id AND s.user_id = v.viewer) AS is_subscribed,
    COUNT(*) OVER() AS count
";

pub async fn get_user_by_id(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> = sqlx::query_as(
        "SELECT id, email, username, first_name, last_name, role FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_view(
    user_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<UserView, potion::Error> {
    list_user_views(&[user_id], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| not_found("No user exists with specified id"))
}

pub async fn list_user_views(
    user_ids: &[Id],
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserView>, potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users u CROSS JOIN (SELECT $1::INTEGER AS viewer) v WHERE u.id = ANY($2)"
    ))
    .bind(viewer)
    .bind(user_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(UserView::from).collect())
}

pub async fn list_users(
    viewer: Option<Id>,
    page: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<Page<UserView>, potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users u CROSS JOIN (SELECT $1::INTEGER AS viewer) v ORDER BY u.id LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let users = rows.into_iter().map(UserView::from).collect();
    Ok(Page::from_rows(users, total_count, page)?)
}

pub async fn is_subscribed(
    author_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, potion::Error> {
    let result: Option<(Id,)> =
        sqlx::query_as("SELECT author_id FROM subscriptions WHERE author_id = $1 AND user_id = $2")
            .bind(author_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(result.is_some())
}

pub async fn subscribe(
    author_id: Id,
    session: &SessionData,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if get_user_by_id(author_id, pool).await?.is_none() {
        return Err(not_found("No user exists with specified id"));
    }
    if author_id == session.user_id {
        return Err(HtmlError::InvalidRequest.new("You cannot subscribe to yourself"));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(session.user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("Already subscribed to this author"));
    }

    log::debug!("user {} subscribed to {author_id}", session.user_id);
    let mut views =
        subscription_views(vec![author_id], Some(session.user_id), recipes_limit, pool).await?;
    views
        .pop()
        .ok_or_else(|| not_found("No user exists with specified id"))
}

pub async fn unsubscribe(
    author_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if get_user_by_id(author_id, pool).await?.is_none() {
        return Err(not_found("No user exists with specified id"));
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new("Not subscribed to this author"));
    }

    log::debug!("user {} unsubscribed from {author_id}", session.user_id);
    Ok(())
}

pub async fn list_subscriptions(
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Page<SubscriptionView>, potion::Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let rows: Vec<(Id, i64)> = sqlx::query_as(
        "
        SELECT s.author_id, COUNT(*) OVER()
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.1).unwrap_or(0);
    let author_ids = rows.into_iter().map(|r| r.0).collect();
    let views = subscription_views(author_ids, Some(session.user_id), recipes_limit, pool).await?;

    Ok(Page::from_rows(views, total_count, page)?)
}

/// Views for `author_ids`, in that order, each with the author's recipes
/// newest first.
async fn subscription_views(
    author_ids: Vec<Id>,
    viewer: Option<Id>,
    recipes_limit: Option<usize>,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionView>, potion::Error> {
    if author_ids.is_empty() {
        return Ok(vec![]);
    }

    let authors = list_user_views(&author_ids, viewer, pool).await?;
    let recipes: Vec<RecipeShortRow> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ANY($1)
        ORDER BY pub_date DESC, id DESC
    ",
    )
    .bind(&author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;
    let mut recipes = group_by_key(recipes);

    Ok(author_ids
        .into_iter()
        .filter_map(|id| {
            let author = authors.iter().find(|a| a.id == id)?.clone();
            let recipes = recipes.remove(&id).unwrap_or_default();
            Some(SubscriptionView::assemble(author, recipes, recipes_limit))
        })
        .collect())
}
