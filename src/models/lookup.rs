//! Controlled vocabulary: lookup types and their values

use serde::{Deserialize, Serialize};

/// Lookup type code grouping the role vocabulary
pub const USER_ROLE: &str = "USER_ROLE";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LookupType {
    pub id: i32,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lookup {
    pub id: i32,
    pub lookup_type_id: i32,
    pub code: String,
    pub name: String,
    pub value: String,
    pub sort_order: i32,
}

/// Lookup code and display name derived from a lowercase value
/// (`front_desk` -> `FRONT_DESK`, `Front Desk`)
pub fn code_and_name_for_value(value: &str) -> (String, String) {
    let code = value.to_uppercase();
    let name = value
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    (code, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_and_name_for_value() {
        assert_eq!(
            code_and_name_for_value("client"),
            ("CLIENT".to_string(), "Client".to_string())
        );
        assert_eq!(
            code_and_name_for_value("front_desk"),
            ("FRONT_DESK".to_string(), "Front Desk".to_string())
        );
    }
}
