use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::CartPart;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

impl ShoppingItem {
    pub fn line(&self, number: usize) -> String {
        format!(
            "{number}) {} ({}) — {}",
            self.name, self.measurement_unit, self.amount
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    pub items: Vec<ShoppingItem>,
}

impl ShoppingList {
    /// Sums the amounts of identical (name, unit) pairs across all cart
    /// recipes. The same name with a different unit stays a separate line.
    pub fn from_parts(parts: impl IntoIterator<Item = CartPart>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for part in parts {
            *totals
                .entry((part.name, part.measurement_unit))
                .or_insert(0) += i64::from(part.amount);
        }

        Self {
            items: totals
                .into_iter()
                .map(|((name, measurement_unit), amount)| ShoppingItem {
                    name,
                    measurement_unit,
                    amount,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| item.line(i + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn part(recipe_id: i32, name: &str, unit: &str, amount: i32) -> CartPart {
        CartPart {
            recipe_id,
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn amounts_are_summed_per_name_and_unit() {
        let list = ShoppingList::from_parts(vec![
            part(1, "sugar", "g", 100),
            part(1, "milk", "ml", 200),
            part(2, "sugar", "g", 50),
            part(2, "sugar", "tbsp", 2),
        ]);

        assert_eq!(
            list.items,
            vec![
                ShoppingItem {
                    name: "milk".into(),
                    measurement_unit: "ml".into(),
                    amount: 200
                },
                ShoppingItem {
                    name: "sugar".into(),
                    measurement_unit: "g".into(),
                    amount: 150
                },
                ShoppingItem {
                    name: "sugar".into(),
                    measurement_unit: "tbsp".into(),
                    amount: 2
                },
            ]
        );
    }

    #[test]
    fn totals_do_not_overflow_small_amounts() {
        let list = ShoppingList::from_parts(
            (0..3).map(|recipe| part(recipe, "flour", "g", i32::MAX)),
        );
        assert_eq!(list.items[0].amount, 3 * i64::from(i32::MAX));
    }

    #[test]
    fn lines_are_numbered_from_one() {
        let list = ShoppingList::from_parts(vec![part(1, "eggs", "pcs", 3), part(1, "salt", "g", 5)]);
        assert_eq!(
            list.lines(),
            vec!["1) eggs (pcs) — 3".to_string(), "2) salt (g) — 5".to_string()]
        );
    }

    #[test]
    fn empty_cart_gives_empty_list() {
        assert!(ShoppingList::from_parts(Vec::new()).is_empty());
    }
}
