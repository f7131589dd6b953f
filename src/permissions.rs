use std::collections::HashMap;

use crate::models::{Document, Role};

/// Known users and their roles.
#[derive(Debug, Default)]
pub struct Permissions {
    roles: HashMap<String, Role>,
}

impl Permissions {
    pub fn new(users: impl IntoIterator<Item = (String, Role)>) -> Self {
        Self {
            roles: users.into_iter().collect(),
        }
    }

    pub fn role(&self, user: &str) -> Option<Role> {
        self.roles.get(user).copied()
    }

    pub fn can_create(&self, user: &str) -> bool {
        matches!(
            self.role(user),
            Some(Role::Administrator | Role::Editor | Role::Author)
        )
    }

    /// Editors edit everything, authors only their own documents.
    pub fn can_edit(&self, user: &str, document: &Document) -> bool {
        match self.role(user) {
            Some(Role::Administrator | Role::Editor) => true,
            Some(Role::Author) => document.author == user,
            Some(Role::Subscriber) | None => false,
        }
    }
}
