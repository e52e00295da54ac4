use std::{borrow::Cow, rc::Rc};

use derive_ex::derive_ex;

use crate::{Channel, HookContext, InjectionError};


const UNKNOWN_SERVICE: &str = "unknown_service";

/// A value built from parameters by a provider and injected by the components below it.
#[derive_ex(Clone, bound())]
pub struct Service<P: 'static, R: 'static> {
    factory: Rc<dyn Fn(&P) -> R>,
    channel: Channel<R>,
}

impl<P: 'static, R: 'static> Service<P, R> {
    /// Create a service named `"unknown_service"`.
    pub fn new(factory: impl Fn(&P) -> R + 'static) -> Self {
        create_service(UNKNOWN_SERVICE, factory)
    }

    pub fn name(&self) -> &str {
        self.channel.name()
    }

    /// Build the value from `params` and make it injectable inside `children`.
    ///
    /// The factory runs on every call, that is on every render of the provider.
    pub fn provide(&self, cx: &mut HookContext, params: &P, children: impl FnOnce(&mut HookContext)) {
        tracing::trace!(service = self.name(), "provide");
        let value = Rc::new((self.factory)(params));
        self.channel.provide(cx, value, children)
    }

    /// The value of the nearest enclosing provider.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError`] if no provider encloses `cx`.
    pub fn inject(&self, cx: &HookContext) -> Result<Rc<R>, InjectionError> {
        self.channel
            .consume(cx)
            .ok_or_else(|| InjectionError::new(Cow::Owned(self.name().to_owned())))
    }
}

/// Define a service.
pub fn create_service<P: 'static, R: 'static>(
    name: impl Into<Cow<'static, str>>,
    factory: impl Fn(&P) -> R + 'static,
) -> Service<P, R> {
    Service {
        factory: Rc::new(factory),
        channel: Channel::new(name),
    }
}
