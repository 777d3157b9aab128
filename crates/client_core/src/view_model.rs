//! Pure mapping from backend records to what the UI renders.

use std::collections::HashMap;

use shared::{
    domain::{ObjectId, ResourceObject, RoleType},
    protocol::UserProfile,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub display_name: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAction {
    pub object_id: ObjectId,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRow {
    pub id: ObjectId,
    pub label: String,
    pub type_label: &'static str,
    pub parent_label: Option<String>,
    pub delete: DeleteAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceListView {
    pub rows: Vec<ResourceRow>,
}

impl ResourceListView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.rows.iter().any(|row| row.id == id)
    }
}

pub fn delete_prompt(id: ObjectId) -> String {
    format!("Delete object #{id}?")
}

pub fn profile_view(profile: &UserProfile) -> ProfileView {
    let full_name = [profile.first_name.as_deref(), profile.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let display_name = if full_name.is_empty() {
        profile.username.clone()
    } else {
        full_name
    };

    let mut roles: Vec<String> = profile
        .roles
        .iter()
        .map(|entry| role_label(entry.role_type).to_string())
        .collect();
    if let Some(role) = profile.role.as_deref().map(str::trim) {
        let label = match role.parse::<RoleType>() {
            Ok(role_type) => role_label(role_type).to_string(),
            Err(_) => role.to_string(),
        };
        if !label.is_empty() && !roles.iter().any(|known| known.eq_ignore_ascii_case(&label)) {
            roles.push(label);
        }
    }
    roles.sort();
    roles.dedup();

    ProfileView {
        display_name,
        username: profile.username.clone(),
        email: profile.email.clone(),
        roles,
    }
}

fn role_label(role: RoleType) -> &'static str {
    match role {
        RoleType::RoleAdmin => "Administrator",
        RoleType::RoleUser => "User",
    }
}

/// Keeps the backend's order. Parents outside the listed set are shown by id.
pub fn resource_list_view(objects: &[ResourceObject]) -> ResourceListView {
    let names: HashMap<ObjectId, &str> = objects
        .iter()
        .map(|object| (object.id, object.name.trim()))
        .collect();

    let rows = objects
        .iter()
        .map(|object| {
            let label = match object.name.trim() {
                "" => "(unnamed)".to_string(),
                name => name.to_string(),
            };
            let parent_label = object.parent_id.map(|parent| match names.get(&parent) {
                Some(name) if !name.is_empty() => (*name).to_string(),
                _ => format!("#{parent}"),
            });
            ResourceRow {
                id: object.id,
                label,
                type_label: object.object_type.label(),
                parent_label,
                delete: DeleteAction {
                    object_id: object.id,
                    prompt: delete_prompt(object.id),
                },
            }
        })
        .collect();

    ResourceListView { rows }
}
