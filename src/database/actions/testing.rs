use sqlx::{Executor, Pool, Postgres};

use crate::{
    jwt::SessionData,
    payload::{IngredientAmount, Limits, RecipeDraft, RecipePayload},
    schema::{Id, UserRole},
};

pub async fn schema(pool: &Pool<Postgres>) {
    pool.execute(include_str!("../../../sql/schema.sql"))
        .await
        .unwrap();
}

pub async fn user(pool: &Pool<Postgres>, username: &str, role: UserRole) -> SessionData {
    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, role)
        VALUES ($1, $2, 'Test', 'Cook', $3)
        RETURNING id
    ",
    )
    .bind(format!("{username}@example.com"))
    .bind(username)
    .bind(role.clone())
    .fetch_one(pool)
    .await
    .unwrap();

    SessionData::new(id.0, username.to_string(), role)
}

pub async fn tag(pool: &Pool<Postgres>, slug: &str) -> Id {
    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO tags (name, color, slug)
        SELECT $1, '#' || lpad(to_hex(COUNT(*)::INTEGER), 6, '0'), $1 FROM tags
        RETURNING id
    ",
    )
    .bind(slug)
    .fetch_one(pool)
    .await
    .unwrap();
    id.0
}

pub async fn ingredient(pool: &Pool<Postgres>, name: &str, unit: &str) -> Id {
    let id: (Id,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit)
    .fetch_one(pool)
    .await
    .unwrap();
    id.0
}

pub fn draft(ingredients: &[(Id, i32)], tags: &[Id], image: Option<&str>) -> RecipeDraft {
    RecipePayload {
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
        tags: tags.to_vec(),
        name: "Test recipe".into(),
        image: image.map(str::to_string),
        text: "Cook it.".into(),
        cooking_time: 15,
    }
    .validate(&Limits::default())
    .unwrap()
}

pub fn ok<T>(result: Result<T, potion::Error>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("request failed: {} {:?}", e.code, e.info),
    }
}

pub fn err<T>(result: Result<T, potion::Error>) -> potion::Error {
    match result {
        Ok(_) => panic!("request unexpectedly succeeded"),
        Err(e) => e,
    }
}
