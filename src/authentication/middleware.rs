use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::constants::SESSION_HEADER;

use super::jwt::{bearer_token, verify_jwt_session, SessionData, SessionKey};

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

fn authenticate(header: Option<&str>, key: &SessionKey) -> Option<SessionData> {
    let token = bearer_token(header?)?;
    match verify_jwt_session(token, key) {
        Ok(data) => Some(data.into()),
        Err(e) => {
            log::debug!("{e}");
            None
        }
    }
}

/// Requires a valid bearer session.
pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>(SESSION_HEADER).and_then(move |header: Option<String>| {
        let key = key.clone();
        async move {
            authenticate(header.as_deref(), &key).ok_or_else(|| reject::custom(Unauthorized))
        }
    })
}

/// Anonymous requests pass through as `None`; recipe listings use this to
/// fill the per-viewer flags.
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>(SESSION_HEADER)
        .map(move |header: Option<String>| authenticate(header.as_deref(), &key))
}
