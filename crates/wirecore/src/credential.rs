use crate::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider a credential authenticates against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialType {
    Anthropic,
    #[serde(rename = "OPENAI")]
    OpenAi,
    Gemini,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::Anthropic => "ANTHROPIC",
            CredentialType::OpenAi => "OPENAI",
            CredentialType::Gemini => "GEMINI",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANTHROPIC" => Ok(CredentialType::Anthropic),
            "OPENAI" => Ok(CredentialType::OpenAi),
            "GEMINI" => Ok(CredentialType::Gemini),
            other => Err(format!("unknown credential type '{}'", other)),
        }
    }
}

/// A credential as handed to executors: the secret is already decrypted.
#[derive(Clone, PartialEq)]
pub struct Credential {
    pub id: String,
    pub owner_id: UserId,
    pub name: String,
    pub credential_type: CredentialType,
    pub secret: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("name", &self.name)
            .field("credential_type", &self.credential_type)
            .field("secret", &"<redacted>")
            .finish()
    }
}
