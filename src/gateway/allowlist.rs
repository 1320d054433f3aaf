use crate::gateway::types::ModelId;
use std::collections::HashSet;

/// Raised when a candidate's qualified name is not in the allowlist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("model '{qualified_name}' is not in the allowlist")]
pub struct ModelNotAllowed {
    pub qualified_name: String,
}

/// The set of qualified model names permitted for use.
///
/// Built once at process start from configuration and immutable thereafter,
/// so it is shared freely across concurrent missions. Membership is an
/// exact, case-sensitive string match on the qualified name.
#[derive(Debug, Clone, Default)]
pub struct ModelAllowlist {
    allowed: HashSet<String>,
}

impl ModelAllowlist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn contains(&self, model: &ModelId) -> bool {
        self.allowed.contains(&model.qualified_name())
    }

    /// Succeeds silently when the model is permitted. The router runs this
    /// before every provider attempt so no network call is ever spent on a
    /// disallowed model.
    pub fn assert_allowed(&self, model: &ModelId) -> Result<(), ModelNotAllowed> {
        if self.contains(model) {
            Ok(())
        } else {
            Err(ModelNotAllowed {
                qualified_name: model.qualified_name(),
            })
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::ProviderKind;

    #[test]
    fn membership_is_exact_and_case_sensitive() {
        let allowlist = ModelAllowlist::new(["openai:gpt-5", "anthropic:claude-sonnet-4-5"]);

        let allowed = ModelId::new(ProviderKind::OpenAi, "gpt-5").unwrap();
        assert!(allowlist.assert_allowed(&allowed).is_ok());

        let wrong_case = ModelId::new(ProviderKind::OpenAi, "GPT-5").unwrap();
        assert!(allowlist.assert_allowed(&wrong_case).is_err());

        let missing = ModelId::new(ProviderKind::Gemini, "gemini-2.5-pro").unwrap();
        let err = allowlist.assert_allowed(&missing).unwrap_err();
        assert_eq!(err.qualified_name, "gemini:gemini-2.5-pro");
    }

    #[test]
    fn empty_allowlist_rejects_everything() {
        let allowlist = ModelAllowlist::default();
        assert!(allowlist.is_empty());
        let model = ModelId::new(ProviderKind::OpenAi, "gpt-5").unwrap();
        assert!(!allowlist.contains(&model));
    }
}
