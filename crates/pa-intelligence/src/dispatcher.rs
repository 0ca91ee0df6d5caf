//! Name → handler resolution.
//!
//! The dispatcher performs no clinical logic.  It answers two questions for
//! an interaction name and a target environment: is there a handler for it
//! (`UnknownInteraction` if not), and does the environment declare it
//! (`UnsupportedInteraction` if not).  The simulation loop asks the same
//! questions again for every proposed record entry before applying a step,
//! so an intelligence cannot record an interaction the environment does not
//! offer.

use std::collections::BTreeMap;
use std::sync::Arc;

use pa_agent::{DEATH_INTERACTION, Environment};
use pa_core::PatientRng;

use crate::handler::DeathHandler;
use crate::{
    DispatchError, DispatchResult, InteractionContext, InteractionHandler, InteractionOutcome,
};

/// Registry of interaction handlers.
///
/// Always contains the built-in `death` handler.  Cloning is cheap: handlers
/// are reference counted and shared by every clone.
#[derive(Clone)]
pub struct InteractionDispatcher {
    handlers: BTreeMap<String, Arc<dyn InteractionHandler>>,
}

impl Default for InteractionDispatcher {
    fn default() -> Self {
        let mut handlers: BTreeMap<String, Arc<dyn InteractionHandler>> = BTreeMap::new();
        handlers.insert(DEATH_INTERACTION.to_string(), Arc::new(DeathHandler));
        Self { handlers }
    }
}

impl std::fmt::Debug for InteractionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionDispatcher")
            .field("interactions", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl InteractionDispatcher {
    /// Dispatcher holding only the built-in `death` handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::ReservedName`] for `death`.
    /// - [`DispatchError::AlreadyRegistered`] if `name` already has a handler.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl InteractionHandler,
    ) -> DispatchResult<()> {
        let name = name.into();
        if name == DEATH_INTERACTION {
            return Err(DispatchError::ReservedName(name));
        }
        if self.handlers.contains_key(&name) {
            return Err(DispatchError::AlreadyRegistered(name));
        }
        self.handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    /// [`register`](Self::register) for a closure, with its argument types
    /// inferred.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> DispatchResult<()>
    where
        F: Fn(&InteractionContext<'_>, &mut PatientRng) -> InteractionOutcome
            + Send
            + Sync
            + 'static,
    {
        self.register(name, f)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(
        mut self,
        name: impl Into<String>,
        handler: impl InteractionHandler,
    ) -> DispatchResult<Self> {
        self.register(name, handler)?;
        Ok(self)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in sorted order, `death` included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Check `name` against the registry and against `environment`'s
    /// declared interactions without resolving a handler.
    pub fn validate(&self, name: &str, environment: &Environment) -> DispatchResult<()> {
        self.resolve(name, environment).map(|_| ())
    }

    /// Handler for `name` in `environment`.
    pub fn resolve(
        &self,
        name: &str,
        environment: &Environment,
    ) -> DispatchResult<&dyn InteractionHandler> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| DispatchError::UnknownInteraction(name.to_string()))?;
        if !environment.declares(name) {
            return Err(DispatchError::UnsupportedInteraction {
                interaction: name.to_string(),
                environment: environment.environment_id,
            });
        }
        Ok(handler.as_ref())
    }

    /// Resolve `ctx.interaction` in `ctx.environment` and run its handler.
    pub fn dispatch(
        &self,
        ctx: &InteractionContext<'_>,
        rng: &mut PatientRng,
    ) -> DispatchResult<InteractionOutcome> {
        let handler = self.resolve(ctx.interaction, ctx.environment)?;
        Ok(handler.handle(ctx, rng))
    }
}
