use serde::{Deserialize, Deserializer, Serialize};

/// Profile of the signed-in user as reported by the identity endpoint.
/// `Identity::default()` is the empty identity of a logged-out session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Identity {
    pub fn is_empty(&self) -> bool { *self == Identity::default() }

    /// Overwrite only the fields present in `patch`.
    pub fn merge(&mut self, patch: IdentityPatch) {
        if let Some(v) = patch.id { self.id = v; }
        if let Some(v) = patch.username { self.username = v; }
        if let Some(v) = patch.email { self.email = v; }
        if let Some(v) = patch.full_name { self.full_name = v; }
        if let Some(v) = patch.is_admin { self.is_admin = v; }
    }
}

/// Partial identity update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

/// Payload for admin-side account creation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

// The API sends `null` for unset optional profile fields.
fn null_as_empty<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_api_shape_with_nulls() {
        let id: Identity = serde_json::from_value(json!({
            "id": "1", "username": "alice", "email": null, "full_name": "Alice A", "is_admin": false
        }))
        .unwrap();
        assert_eq!(id.username, "alice");
        assert_eq!(id.email, "");
        assert!(!id.is_empty());
    }

    #[test]
    fn merge_touches_only_given_fields() {
        let mut id = Identity { id: "1".into(), username: "alice".into(), ..Default::default() };
        id.merge(IdentityPatch { full_name: Some("Alice Liddell".into()), ..Default::default() });
        assert_eq!(id.username, "alice");
        assert_eq!(id.full_name, "Alice Liddell");
        assert!(!id.is_admin);
    }
}
