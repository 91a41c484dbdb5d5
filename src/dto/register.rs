use serde::Deserialize;
use validator::Validate;

use crate::dao::models::Team;

/// Registration form input as captured by the presentation layer.
///
/// The name is expected pre-trimmed (see
/// [`RegisterRequest::trimmed`]); the team stays optional so "no team
/// chosen yet" is representable and rejected by validation rather than by
/// the type system.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name, 1 to 20 characters after trimming.
    #[validate(length(min = 1, max = 20, message = "name must be 1 to 20 characters"))]
    pub name: String,
    /// Chosen team.
    #[validate(required(message = "a team must be chosen"))]
    pub team: Option<Team>,
}

impl RegisterRequest {
    /// Build a request for the given form fields.
    pub fn new(name: impl Into<String>, team: Option<Team>) -> Self {
        Self {
            name: name.into(),
            team,
        }
    }

    /// Copy of the request with surrounding whitespace stripped off the name.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            team: self.team,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_plain_name_and_team() {
        let request = RegisterRequest::new("Ana", Some(Team::Blue)).trimmed();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn rejects_blank_names() {
        for name in ["", "   ", "\t"] {
            let request = RegisterRequest::new(name, Some(Team::Blue)).trimmed();
            assert!(request.validate().is_err(), "{name:?}");
        }
    }

    #[test]
    fn rejects_names_longer_than_twenty_chars() {
        let request = RegisterRequest::new("a".repeat(21), Some(Team::Red)).trimmed();
        assert!(request.validate().is_err());
    }

    #[test]
    fn rejects_a_missing_team() {
        let request = RegisterRequest::new("Ana", None).trimmed();
        assert!(request.validate().is_err());
    }
}
