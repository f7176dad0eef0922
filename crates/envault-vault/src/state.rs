// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The client's persisted application state.
//!
//! Serialized field names are camelCase so blobs written by the web client
//! and by this crate are interchangeable.

use serde::{Deserialize, Serialize};

/// Version written into every [`PersistedState`].
pub const STATE_VERSION: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Email,
    Google,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub auth_provider: AuthProvider,
}

/// Partial update applied by [`AppState::update_user`]. `None` fields are kept.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub id: String,
    pub key: String,
    pub value: String,
    pub is_secret: bool,
}

/// A variable before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVariable {
    pub key: String,
    pub value: String,
    pub is_secret: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VariableUpdate {
    pub key: Option<String>,
    pub value: Option<String>,
    pub is_secret: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub variables: Vec<EnvironmentVariable>,
    pub created_at: String,
}

/// Everything the client keeps between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub user: Option<User>,
}

/// The record actually written to the key-value store: state plus a version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub state: AppState,
    #[serde(default)]
    pub version: u32,
}

impl PersistedState {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            version: STATE_VERSION,
        }
    }
}

impl AppState {
    pub fn login(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn logout(&mut self) {
        self.user = None;
    }

    /// Merge `updates` into the signed-in user. No-op when signed out.
    pub fn update_user(&mut self, updates: UserUpdate) {
        let Some(user) = self.user.as_mut() else {
            return;
        };
        if let Some(v) = updates.first_name {
            user.first_name = v;
        }
        if let Some(v) = updates.last_name {
            user.last_name = v;
        }
        if let Some(v) = updates.username {
            user.username = v;
        }
        if let Some(v) = updates.email {
            user.email = v;
        }
        if let Some(v) = updates.avatar {
            user.avatar = Some(v);
        }
    }

    /// Sign out and drop every project.
    pub fn delete_account(&mut self) {
        self.user = None;
        self.projects.clear();
    }

    /// Append a new empty project and return its id.
    pub fn add_project(&mut self, name: &str, description: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.projects.push(Project {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            variables: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        });
        id
    }

    pub fn delete_project(&mut self, id: &str) {
        self.projects.retain(|p| p.id != id);
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Add a variable to a project. Returns the new variable's id, or `None`
    /// if the project does not exist.
    pub fn add_variable(&mut self, project_id: &str, variable: NewVariable) -> Option<String> {
        let project = self.projects.iter_mut().find(|p| p.id == project_id)?;
        let id = uuid::Uuid::new_v4().to_string();
        project.variables.push(EnvironmentVariable {
            id: id.clone(),
            key: variable.key,
            value: variable.value,
            is_secret: variable.is_secret,
        });
        Some(id)
    }

    pub fn delete_variable(&mut self, project_id: &str, variable_id: &str) {
        if let Some(project) = self.projects.iter_mut().find(|p| p.id == project_id) {
            project.variables.retain(|v| v.id != variable_id);
        }
    }

    pub fn update_variable(&mut self, project_id: &str, variable_id: &str, updates: VariableUpdate) {
        let variable = self
            .projects
            .iter_mut()
            .filter(|p| p.id == project_id)
            .flat_map(|p| p.variables.iter_mut())
            .find(|v| v.id == variable_id);
        let Some(variable) = variable else {
            return;
        };
        if let Some(key) = updates.key {
            variable.key = key;
        }
        if let Some(value) = updates.value {
            variable.value = value;
        }
        if let Some(is_secret) = updates.is_secret {
            variable.is_secret = is_secret;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            avatar: None,
            auth_provider: AuthProvider::Email,
        }
    }

    #[test]
    fn serializes_with_client_field_names() {
        let mut state = AppState::default();
        state.login(alice());
        let project_id = state.add_project("api", "backend");
        state
            .add_variable(
                &project_id,
                NewVariable {
                    key: "DB_URL".into(),
                    value: "postgres://".into(),
                    is_secret: true,
                },
            )
            .unwrap();

        let json = serde_json::to_value(PersistedState::new(state)).unwrap();
        assert_eq!(json["version"], 0);
        assert_eq!(json["state"]["user"]["firstName"], "Alice");
        assert_eq!(json["state"]["user"]["authProvider"], "email");
        assert!(json["state"]["user"].get("avatar").is_none());
        let project = &json["state"]["projects"][0];
        assert!(project["createdAt"].is_string());
        assert_eq!(project["variables"][0]["isSecret"], true);
    }

    #[test]
    fn parses_client_written_blob() {
        let raw = r#"{"state":{"projects":[],"user":{"firstName":"A","lastName":"B",
            "username":"ab","email":"a@b.c","authProvider":"google"}},"version":0}"#;
        let parsed: PersistedState = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.state.user.unwrap().auth_provider,
            AuthProvider::Google
        );
    }

    #[test]
    fn project_and_variable_lifecycle() {
        let mut state = AppState::default();
        let pid = state.add_project("web", "");
        let vid = state
            .add_variable(
                &pid,
                NewVariable {
                    key: "TOKEN".into(),
                    value: "a".into(),
                    is_secret: false,
                },
            )
            .unwrap();

        state.update_variable(
            &pid,
            &vid,
            VariableUpdate {
                value: Some("b".into()),
                is_secret: Some(true),
                ..Default::default()
            },
        );
        let var = &state.project(&pid).unwrap().variables[0];
        assert_eq!(var.key, "TOKEN");
        assert_eq!(var.value, "b");
        assert!(var.is_secret);

        state.delete_variable(&pid, &vid);
        assert!(state.project(&pid).unwrap().variables.is_empty());

        state.delete_project(&pid);
        assert!(state.projects.is_empty());
    }

    #[test]
    fn add_variable_to_missing_project() {
        let mut state = AppState::default();
        let added = state.add_variable(
            "nope",
            NewVariable {
                key: "K".into(),
                value: "v".into(),
                is_secret: false,
            },
        );
        assert!(added.is_none());
    }

    #[test]
    fn user_updates_and_account_deletion() {
        let mut state = AppState::default();
        state.update_user(UserUpdate {
            email: Some("x@y.z".into()),
            ..Default::default()
        });
        assert!(state.user.is_none());

        state.login(alice());
        state.update_user(UserUpdate {
            email: Some("new@example.com".into()),
            ..Default::default()
        });
        let user = state.user.as_ref().unwrap();
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.first_name, "Alice");

        state.add_project("p", "");
        state.delete_account();
        assert!(state.user.is_none());
        assert!(state.projects.is_empty());
    }
}
