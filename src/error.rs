use std::{borrow::Cow, error::Error, fmt, rc::Rc};

use parse_display::Display;

#[cfg(test)]
mod tests;

/// An error returned from a user supplied memo, callback or effect body.
///
/// Any [`std::error::Error`] converts into `CallbackError`, so `?` can be used inside callbacks.
#[derive(Debug, Display)]
#[display("{source}")]
pub struct CallbackError {
    source: Box<dyn Error + 'static>,
}

impl CallbackError {
    /// Create an error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            source: Box::new(MessageError(message.to_string())),
        }
    }

    /// The wrapped error.
    pub fn source(&self) -> &(dyn Error + 'static) {
        &*self.source
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref()
    }
}

impl<E: Error + 'static> From<E> for CallbackError {
    fn from(e: E) -> Self {
        Self {
            source: Box::new(e),
        }
    }
}

#[derive(Debug, Display)]
#[display("{0}")]
struct MessageError(String);

impl Error for MessageError {}

/// Raised by [`Service::inject`](crate::Service::inject) when no provider of the service encloses the caller.
#[non_exhaustive]
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("[service inject] cannot inject `{service}` before provided")]
pub struct InjectionError {
    pub service: Cow<'static, str>,
}

impl InjectionError {
    pub(crate) fn new(service: Cow<'static, str>) -> Self {
        Self { service }
    }
}

impl Error for InjectionError {}

/// Receives errors intercepted from callbacks.
///
/// The default handler logs the error with [`tracing`] and drops it.
#[derive(Clone, Default)]
pub struct ErrorHandler(Option<Rc<dyn Fn(CallbackError)>>);

impl ErrorHandler {
    pub fn new(f: impl Fn(CallbackError) + 'static) -> Self {
        Self(Some(Rc::new(f)))
    }

    /// Handler that only logs.
    pub fn log() -> Self {
        Self(None)
    }

    pub fn handle(&self, e: CallbackError) {
        match &self.0 {
            Some(f) => f(e),
            None => tracing::warn!(error = %e, "callback error swallowed"),
        }
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("ErrorHandler(custom)"),
            None => f.write_str("ErrorHandler(log)"),
        }
    }
}

/// Run `f`, routing an error to `on_error`.
pub(crate) fn guard<T>(on_error: &ErrorHandler, f: impl FnOnce() -> Result<T, CallbackError>) -> Option<T> {
    match f() {
        Ok(value) => Some(value),
        Err(e) => {
            on_error.handle(e);
            None
        }
    }
}
