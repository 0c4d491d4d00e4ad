//! Persona registry
//!
//! Personas are immutable system-prompt templates loaded from static
//! configuration at startup. The set is closed: resolving an id outside it
//! is a configuration error, never a silent fallback.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MuseError, MuseResult};

/// A named system-prompt template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub prompt_template: String,
}

impl Persona {
    pub fn new(id: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt_template: prompt_template.into(),
        }
    }

    /// Render the system prompt, appending the project context when present
    pub fn system_prompt(&self, project_context: Option<&str>) -> String {
        match project_context.map(str::trim) {
            Some(context) if !context.is_empty() => {
                format!(
                    "{}\n\nThe user is working on the following project:\n{}",
                    self.prompt_template, context
                )
            }
            _ => self.prompt_template.clone(),
        }
    }
}

/// Closed set of personas, resolved by id
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: HashMap<String, Persona>,
}

impl PersonaRegistry {
    pub fn new(personas: impl IntoIterator<Item = Persona>) -> Self {
        Self {
            personas: personas
                .into_iter()
                .map(|persona| (persona.id.clone(), persona))
                .collect(),
        }
    }

    /// The personas shipped with the product
    pub fn builtin() -> Self {
        Self::new([
            Persona::new(
                "Astra",
                "You are Astra, the resident assistant of the Muse project \
                 workspace. You help people plan, debug, and improve the \
                 projects they share. Be concrete and concise, and ask for \
                 the missing detail when a request is ambiguous.",
            ),
            Persona::new(
                "Forge",
                "You are Forge, a hands-on engineering assistant. You focus \
                 on implementation: code, build setups, and fixing what is \
                 broken. Prefer working examples over abstract advice.",
            ),
            Persona::new(
                "Scout",
                "You are Scout, a research assistant for project ideas. You \
                 surface prior art, compare approaches, and summarize \
                 trade-offs so the user can decide quickly.",
            ),
        ])
    }

    /// Resolve a persona id from the closed set.
    ///
    /// An unknown id indicates server misconfiguration (the client UI only
    /// offers configured personas), so it surfaces as a `Config` error.
    pub fn resolve(&self, id: &str) -> MuseResult<&Persona> {
        self.personas
            .get(id)
            .ok_or_else(|| MuseError::config(format!("unknown persona '{}'", id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.personas.contains_key(id)
    }

    /// Configured persona ids, sorted for stable listings
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.personas.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}
