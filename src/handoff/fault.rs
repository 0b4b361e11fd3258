//! Top-level fault channel for completion failures.

use crate::error::{Error, Result};
use std::cell::{Cell, RefCell};

pub type FaultHandler = Box<dyn FnMut(Error)>;

#[derive(Default)]
pub(crate) struct FaultChannel {
    handler: RefCell<Option<FaultHandler>>,
    /// Bumped on every `set_handler`, so `raise` can tell whether the running
    /// handler replaced or cleared itself.
    installs: Cell<u64>,
    raised: Cell<u64>,
}

impl FaultChannel {
    pub(crate) fn set_handler(&self, handler: Option<FaultHandler>) {
        *self.handler.borrow_mut() = handler;
        self.installs.set(self.installs.get() + 1);
    }

    /// Hands `fault` to the installed handler, or gives it back to the caller
    /// when there is none.
    pub(crate) fn raise(&self, fault: Error) -> Result<()> {
        self.raised.set(self.raised.get() + 1);
        tracing::error!(error = %fault, "completion failed");

        // taken out while it runs so the handler may replace or clear itself
        let handler = self.handler.borrow_mut().take();
        match handler {
            Some(mut handler) => {
                let installs = self.installs.get();
                handler(fault);
                if self.installs.get() == installs {
                    *self.handler.borrow_mut() = Some(handler);
                }
                Ok(())
            }
            None => Err(fault),
        }
    }

    pub(crate) fn raised(&self) -> u64 {
        self.raised.get()
    }
}

impl std::fmt::Debug for FaultChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultChannel")
            .field("has_handler", &self.handler.borrow().is_some())
            .field("raised", &self.raised.get())
            .finish()
    }
}
