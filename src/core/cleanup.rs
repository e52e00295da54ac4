/// Action returned by an effect, run before the effect's next invocation or when its component is torn down.
///
/// The runtime runs it explicitly; dropping a `Cleanup` without running it discards the action.
#[derive(Default)]
#[must_use]
pub struct Cleanup(RawCleanup);

impl Cleanup {
    pub fn empty() -> Self {
        Cleanup(RawCleanup::Empty)
    }
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        Cleanup(RawCleanup::Fn(Box::new(f)))
    }
    pub fn is_empty(&self) -> bool {
        matches!(self.0, RawCleanup::Empty)
    }
    pub fn run(self) {
        match self.0 {
            RawCleanup::Empty => {}
            RawCleanup::Fn(f) => f(),
        }
    }
}

impl From<()> for Cleanup {
    fn from(_: ()) -> Self {
        Cleanup::empty()
    }
}

#[derive(Default)]
enum RawCleanup {
    #[default]
    Empty,
    Fn(Box<dyn FnOnce() + 'static>),
}
