use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{not_found, QueryError, ValidationError},
    payload::RecipeDraft,
    schema::{Id, RecipeTagRow, Tag},
};

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    tag.ok_or_else(|| not_found("No tag exists with specified id"))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeTagRow>, potion::Error> {
    let list: Vec<RecipeTagRow> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Fails with the first id that has no row in `tags`.
pub async fn ensure_tags_exist(tags: &[Id], conn: &mut PgConnection) -> Result<(), potion::Error> {
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if let Some(id) = tags.iter().find(|id| !found.iter().any(|row| row.0 == **id)) {
        return Err(ValidationError::UnknownId {
            field: "tags",
            id: *id,
        }
        .into());
    }

    Ok(())
}

/// Drops every `recipe_tags` row of the recipe and writes the draft's tags
/// instead.
pub async fn replace_recipe_tags(
    recipe_id: Id,
    draft: &RecipeDraft,
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let tags = draft.tags();
    sqlx::query(
        "
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, UNNEST($2::INTEGER[])
    ",
    )
    .bind(recipe_id)
    .bind(tags)
    .execute(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    log::trace!("> Linked {} tags to recipe {recipe_id}", tags.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{self, err, ok};
    use pretty_assertions::assert_eq;
    use sqlx::PgPool;

    #[sqlx::test(migrations = false)]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn unknown_tag_is_named_in_the_error(pool: PgPool) {
        testing::schema(&pool).await;
        let lunch = testing::tag(&pool, "lunch").await;
        let mut conn = pool.acquire().await.unwrap();

        ok(ensure_tags_exist(&[lunch], &mut conn).await);
        let e = err(ensure_tags_exist(&[lunch, 404404, 505505], &mut conn).await);
        assert_eq!(e.code, 400);
        assert!(e.info.as_deref().unwrap_or_default().contains("404404"));

        assert_eq!(ok(get_tag(lunch, &pool).await).slug, "lunch");
        assert_eq!(err(get_tag(lunch + 1, &pool).await).code, 404);
    }
}
