/// Raw contact records from a Views search response
///
/// A search response is a collection keyed by opaque indices whose values
/// are collections of contact records:
///
/// ```json
/// {
///   "contacts": {
///     "0": { "PersonID": "1042", "Forename": "Ada", "Surname": "Byron", "TypeName": "volunteer" },
///     "1": { "PersonID": 1043, "Forename": "Sam", "Email": null }
///   }
/// }
/// ```
///
/// Either level may be a JSON object or an array. Field values may be
/// strings, numbers, or null; blank strings count as absent. `PersonID` is
/// trimmed, every other value is kept as Views sent it.

use super::error::DirectoryError;
use serde_json::{Map, Value};

/// One contact as Views describes it
///
/// Every field is optional here; the sync engine decides what a usable
/// record is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawContact {
    /// `PersonID`
    pub person_id: Option<String>,
    /// `Forename`
    pub forename: Option<String>,
    /// `Surname`
    pub surname: Option<String>,
    /// `Email`
    pub email: Option<String>,
    /// `TypeName` (e.g. "volunteer")
    pub type_name: Option<String>,
    /// `VolunteerStatus_V_1`
    pub volunteer_status: Option<String>,
    /// `DateOfBirth`
    pub date_of_birth: Option<String>,
}

impl RawContact {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            person_id: field(fields, "PersonID").map(|id| id.trim().to_string()),
            forename: field(fields, "Forename"),
            surname: field(fields, "Surname"),
            email: field(fields, "Email"),
            type_name: field(fields, "TypeName"),
            volunteer_status: field(fields, "VolunteerStatus_V_1"),
            date_of_birth: field(fields, "DateOfBirth"),
        }
    }
}

fn field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn entries(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Object(map) => Some(map.values().collect()),
        Value::Array(items) => Some(items.iter().collect()),
        _ => None,
    }
}

/// Parses a search response body
///
/// # Errors
///
/// Returns [`DirectoryError::Parse`] if the body is not JSON or its top level
/// is not a collection
pub fn parse_contacts_body(body: &str) -> Result<Vec<RawContact>, DirectoryError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| DirectoryError::Parse(e.to_string()))?;
    parse_contacts(&value)
}

/// Flattens the two-level collection into contacts
///
/// A leaf that is not an object yields an empty contact, which the sync
/// engine reports as invalid. A second-level object that already carries a
/// `PersonID` is taken as a contact itself.
pub fn parse_contacts(value: &Value) -> Result<Vec<RawContact>, DirectoryError> {
    let groups = entries(value).ok_or_else(|| {
        DirectoryError::Parse("expected an object or array of contact groups".to_string())
    })?;

    let mut contacts = Vec::new();
    for group in groups {
        match group {
            Value::Object(fields) if fields.contains_key("PersonID") => {
                contacts.push(RawContact::from_fields(fields));
            }
            Value::Object(_) | Value::Array(_) => {
                for leaf in entries(group).unwrap_or_default() {
                    match leaf {
                        Value::Object(fields) => contacts.push(RawContact::from_fields(fields)),
                        other => {
                            tracing::debug!(value = %other, "Skipping non-object contact entry");
                            contacts.push(RawContact::default());
                        }
                    }
                }
            }
            other => {
                tracing::debug!(value = %other, "Ignoring scalar contact group");
            }
        }
    }

    Ok(contacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_of_objects() {
        let value = json!({
            "contacts": {
                "0": { "PersonID": "1042", "Forename": "Ada", "Surname": "Byron", "TypeName": "volunteer" },
                "1": { "PersonID": "1043", "Forename": "Sam", "Surname": "Lee" }
            }
        });

        let contacts = parse_contacts(&value).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].person_id.as_deref(), Some("1042"));
        assert_eq!(contacts[0].type_name.as_deref(), Some("volunteer"));
        assert_eq!(contacts[1].surname.as_deref(), Some("Lee"));
    }

    #[test]
    fn test_only_person_id_is_trimmed() {
        let value = json!({ "0": { "PersonID": " 1042 ", "TypeName": " volunteer ", "Surname": "Byron " } });

        let contact = &parse_contacts(&value).unwrap()[0];
        assert_eq!(contact.person_id.as_deref(), Some("1042"));
        assert_eq!(contact.type_name.as_deref(), Some(" volunteer "));
        assert_eq!(contact.surname.as_deref(), Some("Byron "));
    }

    #[test]
    fn test_arrays_at_both_levels() {
        let value = json!([[{ "PersonID": "1" }, { "PersonID": "2" }], [{ "PersonID": "3" }]]);

        let ids: Vec<String> = parse_contacts(&value)
            .unwrap()
            .into_iter()
            .filter_map(|c| c.person_id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_numbers_and_nulls() {
        let value = json!({ "a": [{ "PersonID": 77, "Email": null, "Forename": "  " }] });

        let contact = &parse_contacts(&value).unwrap()[0];
        assert_eq!(contact.person_id.as_deref(), Some("77"));
        assert_eq!(contact.email, None);
        assert_eq!(contact.forename, None);
    }

    #[test]
    fn test_flat_collection_of_contacts() {
        let value = json!({ "0": { "PersonID": "5", "Forename": "Flat" } });

        let contacts = parse_contacts(&value).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].forename.as_deref(), Some("Flat"));
    }

    #[test]
    fn test_non_object_leaf_becomes_empty_contact() {
        let value = json!({ "contacts": ["oops", { "PersonID": "9" }] });

        let contacts = parse_contacts(&value).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0], RawContact::default());
    }

    #[test]
    fn test_empty_response() {
        assert!(parse_contacts(&json!({})).unwrap().is_empty());
        assert!(parse_contacts(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_scalar_top_level_is_rejected() {
        assert!(matches!(parse_contacts(&json!("nope")), Err(DirectoryError::Parse(_))));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_contacts_body("<html>Service Unavailable</html>"),
            Err(DirectoryError::Parse(_))
        ));
    }
}
