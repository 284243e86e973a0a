use super::{Check, NlpProvider};
use crate::error::LintError;
use crate::model::{Alert, Block, File};
use crate::rules::definition::Definition;
use std::sync::Arc;
use tracing::debug;

/// A check type whose logic lives in an [`NlpProvider`]
///
/// Without a provider the rule stays in the rule set (so filters and
/// `vellum list` still see it) but never produces alerts.
pub struct Delegated {
    definition: Definition,
    provider: Option<Arc<dyn NlpProvider>>,
}

impl Delegated {
    pub fn new(definition: Definition, provider: Option<Arc<dyn NlpProvider>>) -> Self {
        Delegated {
            definition,
            provider,
        }
    }
}

impl Check for Delegated {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn run(&self, block: &Block, _file: &File) -> Result<Vec<Alert>, LintError> {
        match &self.provider {
            Some(provider) => provider.run(&self.definition, block),
            None => {
                debug!(
                    rule = %self.definition.name,
                    extends = %self.definition.extends,
                    "no NLP provider configured; skipping"
                );
                Ok(Vec::new())
            }
        }
    }
}
