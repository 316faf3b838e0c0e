use chrono::Utc;
use foodgram_sdk::{
    error::ValidationError,
    payload::{Limits, RecipePayload},
    representation::{group_by_key, RecipeView, UserView},
    schema::{RecipeIngredientRow, RecipeRow, RecipeTagRow},
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn author() -> UserView {
    UserView {
        id: 7,
        email: "chef@example.com".into(),
        username: "chef".into(),
        first_name: "Anna".into(),
        last_name: "Petrova".into(),
        is_subscribed: true,
    }
}

fn catalogue(recipe_id: i32, id: i32, amount: i32) -> RecipeIngredientRow {
    let (name, measurement_unit) = match id {
        1 => ("flour", "g"),
        2 => ("milk", "ml"),
        _ => ("eggs", "pcs"),
    };
    RecipeIngredientRow {
        recipe_id,
        id,
        name: name.into(),
        measurement_unit: measurement_unit.into(),
        amount,
    }
}

fn tag(recipe_id: i32, id: i32) -> RecipeTagRow {
    RecipeTagRow {
        recipe_id,
        id,
        name: format!("tag {id}"),
        color: format!("#00000{id}"),
        slug: format!("tag-{id}"),
    }
}

#[test]
fn payload_is_normalized_then_rendered_back() {
    let payload: RecipePayload = serde_json::from_value(json!({
        "ingredients": [
            {"id": 1, "amount": 200},
            {"id": 2, "amount": 300},
            {"id": 1, "amount": 50}
        ],
        "tags": [2, 1, 2],
        "name": "  Pancakes ",
        "image": "recipes/images/pancakes.png",
        "text": "Mix and fry.",
        "cooking_time": 25
    }))
    .unwrap();

    let draft = payload.validate(&Limits::default()).unwrap();
    assert_eq!(draft.name(), "Pancakes");
    assert_eq!(draft.ingredients(), &[(1, 250), (2, 300)]);
    assert_eq!(draft.tags(), &[2, 1]);
    assert_eq!(draft.require_image(), Ok("recipes/images/pancakes.png"));

    // what the join tables would hold after the write
    let ingredient_rows: Vec<_> = draft
        .ingredients()
        .iter()
        .map(|(id, amount)| catalogue(10, *id, *amount))
        .collect();
    let tag_rows: Vec<_> = draft.tags().iter().map(|id| tag(10, *id)).collect();
    let row = RecipeRow {
        id: 10,
        author_id: 7,
        name: draft.name().to_string(),
        text: draft.text().to_string(),
        image: draft.image().unwrap_or_default().to_string(),
        cooking_time: draft.cooking_time(),
        pub_date: Utc::now(),
        is_favorited: false,
        is_in_shopping_cart: true,
        count: 1,
    };

    let view = RecipeView::assemble(row, author(), ingredient_rows, tag_rows);
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(
        json["ingredients"],
        json!([
            {"id": 1, "name": "flour", "measurement_unit": "g", "amount": 250},
            {"id": 2, "name": "milk", "measurement_unit": "ml", "amount": 300}
        ])
    );
    assert_eq!(json["tags"][0]["slug"], "tag-2");
    assert_eq!(json["author"]["is_subscribed"], true);
    assert_eq!(json["is_in_shopping_cart"], true);
    assert_eq!(json["cooking_time"], 25);
}

#[test]
fn update_payload_may_omit_image() {
    let payload: RecipePayload = serde_json::from_value(json!({
        "ingredients": [{"id": 3, "amount": 2}],
        "tags": [1],
        "name": "Boiled eggs",
        "text": "Boil.",
        "cooking_time": 10
    }))
    .unwrap();

    let draft = payload.validate(&Limits::default()).unwrap();
    assert_eq!(draft.image(), None);
    assert_eq!(
        draft.require_image(),
        Err(ValidationError::Blank { field: "image" })
    );
}

#[test]
fn merged_amounts_respect_configured_limits() {
    let limits = Limits {
        amount: 1..=100,
        cooking_time: 1..=60,
    };
    let payload: RecipePayload = serde_json::from_value(json!({
        "ingredients": [{"id": 1, "amount": 60}, {"id": 1, "amount": 60}],
        "tags": [1],
        "name": "Bread",
        "image": "bread.png",
        "text": "Bake.",
        "cooking_time": 45
    }))
    .unwrap();

    assert_eq!(
        payload.validate(&limits).unwrap_err().field(),
        "amount"
    );
}

#[test]
fn page_rows_are_bucketed_per_recipe() {
    let rows = vec![
        catalogue(1, 1, 100),
        catalogue(2, 2, 200),
        catalogue(1, 3, 2),
    ];
    let grouped = group_by_key(rows);

    assert_eq!(grouped.len(), 2);
    assert_eq!(
        grouped[&1].iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![1, 3]
    );
    assert_eq!(grouped[&2][0].amount, 200);
}
