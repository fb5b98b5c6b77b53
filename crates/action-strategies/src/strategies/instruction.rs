//! Natural-language strategy over the driver's instruction capability.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gamecheck_core_types::{Outcome, QaError};
use tracing::{debug, info, warn};

use super::{remaining, within, Strategy};
use crate::config::{StrategyConfig, StrategyKind};
use crate::context::ResolveContext;
use crate::ports::BrowserDriver;

/// Short imperative phrases handed to the driver's instruction capability.
pub struct NaturalLanguageStrategy {
    driver: Arc<dyn BrowserDriver>,
    phrases: Vec<String>,
}

impl NaturalLanguageStrategy {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: &StrategyConfig) -> Self {
        Self {
            driver,
            phrases: config.phrases.clone(),
        }
    }
}

#[async_trait]
impl Strategy for NaturalLanguageStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NaturalLanguage
    }

    fn is_available(&self) -> bool {
        !self.phrases.is_empty()
    }

    async fn execute(&self, _ctx: &ResolveContext, timeout: Duration) -> Result<Outcome, QaError> {
        let started = Instant::now();
        if !self.driver.supports_instructions() {
            debug!("Driver has no instruction capability");
            return Ok(Outcome::failed(
                self.name(),
                0,
                started.elapsed(),
                "Instruction capability unavailable on driver",
            ));
        }

        let deadline = started + timeout;
        for (index, phrase) in self.phrases.iter().enumerate() {
            let Some(budget) = remaining(deadline) else {
                let err = QaError::timeout("instruction", timeout);
                return super::absorb(self.name(), index as u32, started, err);
            };

            match within("instruction", budget, self.driver.perform_instruction(phrase)).await {
                Ok(()) => {
                    let attempts = index as u32 + 1;
                    info!(strategy = self.name(), attempts, "Instruction succeeded: {}", phrase);
                    return Ok(Outcome::succeeded(self.name(), attempts, started.elapsed()));
                }
                Err(err) if err.is_recoverable() => {
                    warn!("Instruction '{}' failed: {}", phrase, err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Outcome::failed(
            self.name(),
            self.phrases.len() as u32,
            started.elapsed(),
            "No instruction succeeded",
        ))
    }
}
