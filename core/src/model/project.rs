use serde::{Deserialize, Serialize};

use crate::model::task::null_as_empty;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub default_project_id: i64,
}

/// A user a project is shared with, together with their access right.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UserWithRight {
    pub id: i64,
    pub username: String,
    pub right: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub parent_project_id: i64,
    #[serde(deserialize_with = "null_as_empty")]
    pub ancestor_projects: Vec<Project>,
    pub created: String,
    pub updated: String,
    pub owner: User,
    pub position: f64,
    pub identifier: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub background_blur_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_information: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hex_color: String,
}

impl Project {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_project_with_owner() {
        let json = r#"{
            "id": 3,
            "title": "Garden",
            "is_favorite": true,
            "ancestor_projects": null,
            "owner": {"id": 1, "username": "ada", "name": "Ada"},
            "background_information": null
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();

        assert_eq!(project.id, 3);
        assert!(project.is_favorite);
        assert_eq!(project.owner.username, "ada");
        assert!(project.ancestor_projects.is_empty());
    }

    #[test]
    fn test_new_project_only_sends_title_fields() {
        let value = serde_json::to_value(Project::new("Chores")).unwrap();
        assert_eq!(value["title"], "Chores");
        assert!(value.get("hex_color").is_none());
        assert!(value.get("background_information").is_none());
    }
}
