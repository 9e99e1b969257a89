//! Ability identifier compilation
//!
//! Expands an `(action, target)` pair into every identifier an ability row
//! could carry and still apply: the exact record, the record's type, any
//! action on either, and the global wildcards. Matching is a set-membership
//! test against [`Ability::identifier`](crate::types::Ability::identifier),
//! so order carries no meaning.

use crate::types::Target;

/// Candidate identifiers for `action` on `target`, lowercased
pub fn compile(action: &str, target: Option<&Target>) -> Vec<String> {
    let identifiers = match target {
        None => vec![action.to_string(), "*-*".to_string(), "*".to_string()],
        Some(Target::Everything) => vec![format!("{}-*", action), "*-*".to_string()],
        Some(Target::Type { entity_type }) => type_identifiers(action, entity_type),
        Some(Target::Record(record)) => {
            let mut identifiers = type_identifiers(action, &record.entity_type);

            if let Some(key) = record.key {
                identifiers.push(format!("{}-{}-{}", action, record.entity_type, key));
                identifiers.push(format!("*-{}-{}", record.entity_type, key));
            }

            identifiers
        }
    };

    identifiers.into_iter().map(|id| id.to_lowercase()).collect()
}

/// `-owned` variants of already compiled identifiers
pub fn owned_variants(identifiers: &[String]) -> Vec<String> {
    identifiers.iter().map(|id| format!("{}-owned", id)).collect()
}

fn type_identifiers(action: &str, entity_type: &str) -> Vec<String> {
    vec![
        format!("{}-{}", action, entity_type),
        format!("{}-*", action),
        format!("*-{}", entity_type),
        "*-*".to_string(),
    ]
}
