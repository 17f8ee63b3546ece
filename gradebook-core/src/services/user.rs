//! User service - sign-up and lookup

use std::sync::Arc;

use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{NewUser, User};
use crate::ports::Repository;

pub struct UserService {
    repository: Arc<dyn Repository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Register a user
    ///
    /// A taken email is reported as a constraint violation by the database.
    pub fn create_user(&self, user: NewUser) -> Result<User> {
        let user = user.normalized()?;
        let created = self.repository.create_user(&user)?;
        debug!(user_id = created.id, "user created");
        Ok(created)
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.repository
            .get_user(id)?
            .ok_or_else(|| Error::not_found(format!("user {}", id)))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.repository.list_users()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::Country;

    fn service() -> UserService {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        UserService::new(Arc::new(repo))
    }

    #[test]
    fn test_create_and_get() {
        let service = service();
        let created = service
            .create_user(
                NewUser::new(" jane@example.com ")
                    .with_name("Jane")
                    .with_country(Country::Tn),
            )
            .unwrap();

        let fetched = service.get_user(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.email, "jane@example.com");
        assert_eq!(fetched.country, Some(Country::Tn));
        assert_eq!(fetched.average_score, None);
    }

    #[test]
    fn test_duplicate_email_fails() {
        let service = service();
        service.create_user(NewUser::new("same@example.com")).unwrap();
        let err = service
            .create_user(NewUser::new("same@example.com").with_name("Other"))
            .unwrap_err();
        assert!(err.is_unique_violation(), "got {:?}", err);
    }

    #[test]
    fn test_unknown_user() {
        assert!(service().get_user(1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_users_in_id_order() {
        let service = service();
        for email in ["c@example.com", "a@example.com", "b@example.com"] {
            service.create_user(NewUser::new(email)).unwrap();
        }
        let emails: Vec<String> = service
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, vec!["c@example.com", "a@example.com", "b@example.com"]);
    }
}
