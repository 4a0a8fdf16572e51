use tracing::info;

use crate::errors::BuilderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// Local-only sign-in. Credentials are checked for presence, nothing more,
/// and nothing is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::SignedIn(u) => Some(u),
            AuthState::SignedOut => None,
        }
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<User, BuilderError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(BuilderError::InvalidInput("Please enter email and password.".into()));
        }
        let name = email.split('@').next().unwrap_or(email).to_string();
        Ok(self.establish(User { name, email: email.to_string() }))
    }

    pub fn sign_up(&mut self, name: &str, email: &str, password: &str) -> Result<User, BuilderError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(BuilderError::InvalidInput("Please fill in all fields.".into()));
        }
        Ok(self.establish(User { name: name.to_string(), email: email.to_string() }))
    }

    pub fn sign_out(&mut self) {
        *self = AuthState::SignedOut;
    }

    fn establish(&mut self, user: User) -> User {
        info!(email = %user.email, "signed in");
        *self = AuthState::SignedIn(user.clone());
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_requires_both_fields() {
        let mut auth = AuthState::default();
        match auth.sign_in("", "secret") {
            Err(BuilderError::InvalidInput(m)) => assert_eq!(m, "Please enter email and password."),
            other => panic!("unexpected {other:?}"),
        }
        assert!(auth.sign_in("ana@example.com", "").is_err());
        assert_eq!(auth, AuthState::SignedOut);

        let user = auth.sign_in("ana@example.com", "secret").unwrap();
        assert_eq!(user.name, "ana");
        assert_eq!(auth.user().map(|u| u.email.as_str()), Some("ana@example.com"));
    }

    #[test]
    fn sign_up_requires_all_fields_and_sign_out_clears() {
        let mut auth = AuthState::default();
        match auth.sign_up("Ana", " ", "pw") {
            Err(BuilderError::InvalidInput(m)) => assert_eq!(m, "Please fill in all fields."),
            other => panic!("unexpected {other:?}"),
        }
        auth.sign_up("Ana", "ana@example.com", "pw").unwrap();
        assert_eq!(auth.user().map(|u| u.name.as_str()), Some("Ana"));
        auth.sign_out();
        assert!(auth.user().is_none());
    }
}
