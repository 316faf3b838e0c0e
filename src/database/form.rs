use std::str::FromStr;

use warp::{reject::Rejection, Filter};

use super::{
    actions::RecipeFilter, error::TypeError, pagination::PageRequest, schema::Id,
};

/// Raw query pairs; keys may repeat (`?tags=breakfast&tags=lunch`).
pub type FormData = Vec<(String, String)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Every value given for `key`, in query order.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_string())
            .collect()
    }

    /// `Ok(None)` when the key is absent; the last value wins when repeated.
    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        self.get(key)
            .map(|v| {
                v.parse()
                    .map_err(|_e| TypeError::new(&format!("{key}: expected a number")))
            })
            .transpose()
    }

    /// Accepts `1`/`0` as well as `true`/`false`.
    pub fn get_flag(&self, key: &str) -> Result<bool, TypeError> {
        match self.get(key) {
            None | Some("0") | Some("false") => Ok(false),
            Some("1") | Some("true") => Ok(true),
            Some(_) => Err(TypeError::new(&format!("{key}: expected 0 or 1"))),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    pub fn page_request(&self, default_limit: i64) -> Result<PageRequest, TypeError> {
        Ok(PageRequest::new(
            self.get_number("page")?,
            self.get_number("limit")?,
            default_limit,
        ))
    }

    pub fn recipe_filter(&self) -> Result<RecipeFilter, TypeError> {
        Ok(RecipeFilter {
            author: self.get_number::<Id>("author")?,
            tags: self.get_all("tags"),
            is_favorited: self.get_flag("is_favorited")?,
            is_in_shopping_cart: self.get_flag("is_in_shopping_cart")?,
        })
    }

    /// A malformed `recipes_limit` is treated as no limit at all.
    pub fn recipes_limit(&self) -> Option<usize> {
        self.get_number("recipes_limit").ok().flatten()
    }

    /// Ingredient search term.
    pub fn search(&self) -> Option<String> {
        self.get_str("name")
    }
}

pub fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::<FormData>().map(Form::from_data)
}
