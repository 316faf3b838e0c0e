mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod payload;
    pub mod representation;
    pub mod schema;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod shopping {
    pub mod list;
    pub mod pdf;
}

pub mod config;
pub mod import;

pub use actions::*;
pub use authentication::*;
pub use config::{ConfigError, Settings};
pub use constants::*;
pub use database::*;
pub use import::{parse_ingredients, ImportError, IngredientRecord};
pub use shopping::{list::*, pdf::*};
