use std::{collections::HashSet, ops::RangeInclusive};

use serde::{Deserialize, Serialize};

use super::{error::ValidationError, schema::Id};
use crate::constants::{
    AMOUNT_MAX_VALUE, AMOUNT_MIN_VALUE, COOKING_TIME_MAX_VALUE, COOKING_TIME_MIN_VALUE,
    NAME_MAX_LEN,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub amount: RangeInclusive<i32>,
    pub cooking_time: RangeInclusive<i32>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            amount: AMOUNT_MIN_VALUE..=AMOUNT_MAX_VALUE,
            cooking_time: COOKING_TIME_MIN_VALUE..=COOKING_TIME_MAX_VALUE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipePayload {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

/// Only [`RecipePayload::validate`] builds one, so the ingredient and tag
/// lists are never empty and every amount is within the limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    name: String,
    text: String,
    image: Option<String>,
    cooking_time: i32,
    ingredients: Vec<(Id, i32)>,
    tags: Vec<Id>,
}

fn check_range(
    field: &'static str,
    value: i64,
    range: &RangeInclusive<i32>,
) -> Result<(), ValidationError> {
    if value < i64::from(*range.start()) || value > i64::from(*range.end()) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(())
}

/// Sums the amounts of repeated ingredient ids, keeping the position of the
/// first occurrence.
pub fn merge_ingredients(ingredients: &[IngredientAmount]) -> Vec<(Id, i64)> {
    let mut merged: Vec<(Id, i64)> = Vec::with_capacity(ingredients.len());
    for part in ingredients {
        match merged.iter_mut().find(|(id, _)| *id == part.id) {
            Some((_, amount)) => *amount += i64::from(part.amount),
            None => merged.push((part.id, i64::from(part.amount))),
        }
    }
    merged
}

pub fn dedup_tags(tags: &[Id]) -> Vec<Id> {
    let mut seen = HashSet::with_capacity(tags.len());
    tags.iter().copied().filter(|id| seen.insert(*id)).collect()
}

impl RecipePayload {
    pub fn validate(self, limits: &Limits) -> Result<RecipeDraft, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::Blank { field: "name" });
        }
        if name.chars().count() > NAME_MAX_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: NAME_MAX_LEN,
            });
        }

        if self.text.trim().is_empty() {
            return Err(ValidationError::Blank { field: "text" });
        }

        check_range(
            "cooking_time",
            i64::from(self.cooking_time),
            &limits.cooking_time,
        )?;

        if self.ingredients.is_empty() {
            return Err(ValidationError::Empty {
                field: "ingredients",
            });
        }
        for part in self.ingredients.iter() {
            check_range("amount", i64::from(part.amount), &limits.amount)?;
        }
        let ingredients = merge_ingredients(&self.ingredients)
            .into_iter()
            .map(|(id, amount)| {
                check_range("amount", amount, &limits.amount)?;
                // within an i32 range after the check above
                Ok((id, amount as i32))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        if self.tags.is_empty() {
            return Err(ValidationError::Empty { field: "tags" });
        }
        let tags = dedup_tags(&self.tags);

        let image = match self.image {
            Some(image) if image.trim().is_empty() => {
                return Err(ValidationError::Blank { field: "image" })
            }
            image => image,
        };

        Ok(RecipeDraft {
            name,
            text: self.text,
            image,
            cooking_time: self.cooking_time,
            ingredients,
            tags,
        })
    }
}

impl RecipeDraft {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn cooking_time(&self) -> i32 {
        self.cooking_time
    }

    /// (ingredient id, amount), one entry per ingredient.
    pub fn ingredients(&self) -> &[(Id, i32)] {
        &self.ingredients
    }

    pub fn tags(&self) -> &[Id] {
        &self.tags
    }

    /// New recipes must carry an image; updates may omit it.
    pub fn require_image(&self) -> Result<&str, ValidationError> {
        self.image
            .as_deref()
            .ok_or(ValidationError::Blank { field: "image" })
    }

    pub fn ingredient_ids(&self) -> Vec<Id> {
        self.ingredients.iter().map(|(id, _)| *id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload() -> RecipePayload {
        RecipePayload {
            ingredients: vec![
                IngredientAmount { id: 3, amount: 100 },
                IngredientAmount { id: 1, amount: 2 },
            ],
            tags: vec![2, 1],
            name: "  Borscht ".into(),
            image: Some("recipes/img/borscht.png".into()),
            text: "Boil everything.".into(),
            cooking_time: 90,
        }
    }

    #[test]
    fn valid_payload_is_normalized() {
        let draft = payload().validate(&Limits::default()).unwrap();
        assert_eq!(
            draft,
            RecipeDraft {
                name: "Borscht".into(),
                text: "Boil everything.".into(),
                image: Some("recipes/img/borscht.png".into()),
                cooking_time: 90,
                ingredients: vec![(3, 100), (1, 2)],
                tags: vec![2, 1],
            }
        );
    }

    #[test]
    fn repeated_ingredients_are_summed_in_first_seen_order() {
        let mut p = payload();
        p.ingredients.push(IngredientAmount { id: 3, amount: 50 });
        let draft = p.validate(&Limits::default()).unwrap();
        assert_eq!(draft.ingredients, vec![(3, 150), (1, 2)]);
        assert_eq!(draft.ingredient_ids(), vec![3, 1]);
    }

    #[test]
    fn merged_amount_must_stay_in_range() {
        let mut p = payload();
        p.ingredients = vec![
            IngredientAmount { id: 7, amount: 20_000 },
            IngredientAmount { id: 7, amount: 20_000 },
        ];
        assert_eq!(
            p.validate(&Limits::default()),
            Err(ValidationError::OutOfRange {
                field: "amount",
                value: 40_000,
                min: AMOUNT_MIN_VALUE,
                max: AMOUNT_MAX_VALUE,
            })
        );
    }

    #[test]
    fn repeated_tags_are_dropped() {
        let mut p = payload();
        p.tags = vec![4, 4, 1, 4];
        assert_eq!(p.validate(&Limits::default()).unwrap().tags, vec![4, 1]);
    }

    #[test]
    fn empty_lists_are_rejected() {
        let mut p = payload();
        p.ingredients.clear();
        assert_eq!(
            p.validate(&Limits::default()).unwrap_err().field(),
            "ingredients"
        );

        let mut p = payload();
        p.tags.clear();
        assert_eq!(p.validate(&Limits::default()).unwrap_err().field(), "tags");
    }

    #[test]
    fn bounds_come_from_the_limits() {
        let limits = Limits {
            amount: 1..=10,
            cooking_time: 5..=60,
        };

        let mut p = payload();
        p.ingredients = vec![IngredientAmount { id: 1, amount: 10 }];
        p.cooking_time = 5;
        assert!(p.clone().validate(&limits).is_ok());

        p.cooking_time = 4;
        assert_eq!(p.clone().validate(&limits).unwrap_err().field(), "cooking_time");

        p.cooking_time = 60;
        p.ingredients = vec![IngredientAmount { id: 1, amount: 0 }];
        assert_eq!(
            p.validate(&limits),
            Err(ValidationError::OutOfRange {
                field: "amount",
                value: 0,
                min: 1,
                max: 10,
            })
        );
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut p = payload();
        p.name = "   ".into();
        assert_eq!(
            p.validate(&Limits::default()),
            Err(ValidationError::Blank { field: "name" })
        );

        let mut p = payload();
        p.text = "\n".into();
        assert_eq!(
            p.validate(&Limits::default()),
            Err(ValidationError::Blank { field: "text" })
        );

        let mut p = payload();
        p.image = Some(String::new());
        assert_eq!(
            p.validate(&Limits::default()),
            Err(ValidationError::Blank { field: "image" })
        );
    }

    #[test]
    fn long_names_are_rejected() {
        let mut p = payload();
        p.name = "x".repeat(NAME_MAX_LEN + 1);
        assert_eq!(
            p.validate(&Limits::default()),
            Err(ValidationError::TooLong {
                field: "name",
                max: NAME_MAX_LEN
            })
        );
    }

    #[test]
    fn image_is_optional_until_creation() {
        let mut p = payload();
        p.image = None;
        let draft = p.validate(&Limits::default()).unwrap();
        assert_eq!(
            draft.require_image(),
            Err(ValidationError::Blank { field: "image" })
        );
    }

    #[test]
    fn payload_deserializes_without_image() {
        let p: RecipePayload = serde_json::from_value(serde_json::json!({
            "ingredients": [{"id": 1, "amount": 10}],
            "tags": [1],
            "name": "Tea",
            "text": "Steep.",
            "cooking_time": 5
        }))
        .unwrap();
        assert_eq!(p.image, None);
        assert_eq!(p.ingredients, vec![IngredientAmount { id: 1, amount: 10 }]);
    }
}
