//! Anonymous user id storage.
//!
//! The plan service identifies callers by an anonymous user id handed out
//! by `POST /auth/anonymous`. It is kept in the OS keyring.

use crate::error::PlanError;

const SERVICE: &str = "slice";
const USER_ID_KEY: &str = "slice_user_id";

pub fn user_id() -> Result<Option<String>, PlanError> {
    let entry = keyring::Entry::new(SERVICE, USER_ID_KEY)?;
    match entry.get_password() {
        Ok(id) => Ok(Some(id)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_user_id(id: &str) -> Result<(), PlanError> {
    let entry = keyring::Entry::new(SERVICE, USER_ID_KEY)?;
    entry.set_password(id)?;
    Ok(())
}

pub fn clear_user_id() -> Result<(), PlanError> {
    let entry = keyring::Entry::new(SERVICE, USER_ID_KEY)?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
