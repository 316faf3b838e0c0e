use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    constants::IMPORT_CHUNK_SIZE,
    error::{not_found, QueryError, ValidationError},
    import::IngredientRecord,
    payload::RecipeDraft,
    schema::{Id, Ingredient, RecipeIngredientRow},
};

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Ingredient, potion::Error> {
    let row: Option<Ingredient> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    row.ok_or_else(|| not_found("No ingredient exists with specified id"))
}

/// Case-insensitive search on the name. Names starting with `search` come
/// before names merely containing it.
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let search = search.map(str::trim).unwrap_or("");
    if search.is_empty() {
        let rows: Vec<Ingredient> =
            sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await
                .map_err(QueryError::from)?;
        return Ok(rows);
    }

    let pattern = escape_like(search);
    let rows: Vec<Ingredient> = sqlx::query_as(
        "
        SELECT id, name, measurement_unit
        FROM ingredients
        WHERE name ILIKE '%' || $1 || '%'
        ORDER BY (name ILIKE $1 || '%') DESC, name
    ",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub async fn list_recipe_ingredients(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredientRow>, potion::Error> {
    let rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name,
               i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn ensure_ingredients_exist(
    ingredients: &[Id],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ingredients)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if let Some(id) = ingredients
        .iter()
        .find(|id| !found.iter().any(|row| row.0 == **id))
    {
        return Err(ValidationError::UnknownId {
            field: "ingredients",
            id: *id,
        }
        .into());
    }

    Ok(())
}

/// Drops every `recipe_ingredients` row of the recipe and writes the
/// draft's ingredients instead.
pub async fn replace_recipe_ingredients(
    recipe_id: Id,
    draft: &RecipeDraft,
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let ingredients = draft.ingredients();
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    builder.push_values(ingredients.iter(), |mut row, (ingredient_id, amount)| {
        row.push_bind(recipe_id)
            .push_bind(*ingredient_id)
            .push_bind(*amount);
    });

    builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    log::trace!(
        "> Linked {} ingredients to recipe {recipe_id}",
        ingredients.len()
    );
    Ok(())
}

/// Inserts catalogue entries, skipping (name, unit) pairs that already
/// exist. Returns the number of new rows.
pub async fn import_ingredients(
    records: &[IngredientRecord],
    pool: &Pool<Postgres>,
) -> Result<u64, potion::Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let mut inserted = 0;
    for chunk in records.chunks(IMPORT_CHUNK_SIZE) {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");
        builder.push_values(chunk, |mut row, record| {
            row.push_bind(record.name.as_str())
                .push_bind(record.measurement_unit.as_str());
        });
        builder.push(" ON CONFLICT (name, measurement_unit) DO NOTHING");

        let result = builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
        inserted += result.rows_affected();
        log::debug!("imported chunk of {} ingredients", chunk.len());
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{self, ok};
    use pretty_assertions::assert_eq;
    use sqlx::PgPool;

    fn record(name: &str, unit: &str) -> IngredientRecord {
        IngredientRecord {
            name: name.into(),
            measurement_unit: unit.into(),
        }
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
        assert_eq!(escape_like("мука"), "мука");
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn search_puts_prefix_matches_first(pool: PgPool) {
        testing::schema(&pool).await;
        let records = [
            record("rye flour", "g"),
            record("Flour", "g"),
            record("milk", "ml"),
        ];
        assert_eq!(ok(import_ingredients(&records, &pool).await), 3);
        assert_eq!(ok(import_ingredients(&records, &pool).await), 0);

        let names: Vec<String> = ok(list_ingredients(Some(" flo "), &pool).await)
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Flour", "rye flour"]);

        let names: Vec<String> = ok(list_ingredients(Some("%"), &pool).await)
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert!(names.is_empty());
    }
}
