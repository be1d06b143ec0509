//! Module session scope guard.
//!
//! A [`Session`] owns one open context. Dropping it closes the context, which
//! makes `Drop` the single place teardown happens. Normal return and early `?`
//! return both go through it exactly once, as does unwinding in builds that
//! unwind. The release profile sets `panic = "abort"`, so a release build
//! that panics exits without closing and leaves the context to the service.

use crate::error::ProvisionError;
use crate::module::{ContextHandle, ModuleHandle, ModuleService};
use tracing::{debug, error};

pub struct Session<'m, M: ModuleService + ?Sized> {
    service: &'m mut M,
    context: ContextHandle,
    module: Option<ModuleHandle>,
}

impl<'m, M: ModuleService + ?Sized> Session<'m, M> {
    /// Create a connection context.
    ///
    /// Nothing needs tearing down when this fails.
    pub fn open(service: &'m mut M) -> Result<Self, ProvisionError> {
        let context = service.open_context().map_err(|e| {
            error!("open_context failed: {}", e);
            ProvisionError::Context(e)
        })?;
        debug!(context = context.0, "context created");

        Ok(Self {
            service,
            context,
            module: None,
        })
    }

    /// Connect the context to the local module service.
    pub fn connect(&mut self) -> Result<(), ProvisionError> {
        self.service.connect(self.context).map_err(|e| {
            error!("connect failed: {}", e);
            ProvisionError::Connect(e)
        })?;
        debug!(context = self.context.0, "context connected");

        Ok(())
    }

    /// Resolve the trust module object behind the connected context.
    pub fn resolve_module(&mut self) -> Result<ModuleHandle, ProvisionError> {
        let module = self.service.get_module(self.context).map_err(|e| {
            error!("get_module failed: {}", e);
            ProvisionError::Resolve(e)
        })?;
        debug!(module = module.0, "module resolved");

        self.module = Some(module);
        Ok(module)
    }

    pub fn context(&self) -> ContextHandle {
        self.context
    }

    pub fn module(&self) -> Option<ModuleHandle> {
        self.module
    }

    pub fn service(&mut self) -> &mut M {
        &mut *self.service
    }
}

impl<M: ModuleService + ?Sized> Drop for Session<'_, M> {
    fn drop(&mut self) {
        self.service.close(self.context);
        debug!(context = self.context.0, "context closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::simulator::{ModuleState, SimulatedModule};

    #[test]
    fn test_drop_closes_context() {
        let mut module = SimulatedModule::in_memory(ModuleState::default());
        {
            let mut session = Session::open(&mut module).unwrap();
            session.connect().unwrap();
            session.resolve_module().unwrap();
        }

        assert_eq!(module.open_contexts(), 0);
    }

    #[test]
    fn test_connect_failure_still_closes() {
        let mut module = SimulatedModule::in_memory(ModuleState {
            present: false,
            ..ModuleState::default()
        });

        let result = (|| -> Result<(), ProvisionError> {
            let mut session = Session::open(&mut module)?;
            session.connect()?;
            Ok(())
        })();

        assert!(matches!(result, Err(ProvisionError::Connect(_))));
        assert_eq!(module.open_contexts(), 0);
    }

    #[test]
    fn test_resolve_records_module() {
        let mut module = SimulatedModule::in_memory(ModuleState::default());
        let mut session = Session::open(&mut module).unwrap();
        assert_eq!(session.module(), None);

        session.connect().unwrap();
        let handle = session.resolve_module().unwrap();

        assert_eq!(session.module(), Some(handle));
    }
}
