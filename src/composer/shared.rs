use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use modgraph_core::ModuleName;

use super::{Aggregate, Composer};
use crate::error::ComposerError;
use crate::registry::ModuleDeclaration;

/// Thread-safe handle serializing registration and resolution behind one lock.
///
/// Initializers run while the lock is held and must not call back into the
/// same handle.
#[derive(Clone, Default)]
pub struct SharedComposer {
    inner: Arc<Mutex<Composer>>,
}

impl SharedComposer {
    pub fn new(composer: Composer) -> Self {
        Self { inner: Arc::new(Mutex::new(composer)) }
    }

    fn lock(&self) -> MutexGuard<'_, Composer> {
        // A panicking initializer leaves no partial state behind: a node is
        // only recorded once its initializer has returned.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, decl: ModuleDeclaration) -> Result<(), ComposerError> {
        self.lock().register(decl)
    }

    pub fn resolve(&self, name: &ModuleName) -> Result<Arc<Aggregate>, ComposerError> {
        self.lock().resolve(name)
    }

    pub fn resolve_all(&self, names: &[ModuleName]) -> Result<Arc<Aggregate>, ComposerError> {
        self.lock().resolve_all(names)
    }

    pub fn plan(&self, name: &ModuleName) -> Result<Vec<ModuleName>, ComposerError> {
        self.lock().plan(name)
    }

    pub fn cached(&self, name: &str) -> Option<Arc<Aggregate>> {
        self.lock().cached(name)
    }

    /// Runs `f` with exclusive access to the composer
    pub fn with<R>(&self, f: impl FnOnce(&mut Composer) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::registry::Initializer;

    #[test]
    fn test_concurrent_resolution_initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let shared = SharedComposer::default();
        shared
            .register(ModuleDeclaration::parse("storage", &[]).unwrap().with_initializer(
                Initializer::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }),
            ))
            .unwrap();
        shared.register(ModuleDeclaration::parse("services", &["storage"]).unwrap()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || shared.resolve(&ModuleName::from_static("services")).unwrap())
            })
            .collect();
        let aggregates: Vec<Arc<Aggregate>> =
            handles.into_iter().map(|handle| handle.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(aggregates.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn test_panicking_initializer_does_not_wedge_the_composer() {
        let shared = SharedComposer::default();
        shared
            .register(
                ModuleDeclaration::parse("menu", &[])
                    .unwrap()
                    .with_initializer(Initializer::new(|| panic!("menu exploded"))),
            )
            .unwrap();
        shared.register(ModuleDeclaration::parse("storage", &[]).unwrap()).unwrap();

        let worker = shared.clone();
        let outcome = thread::spawn(move || worker.resolve(&ModuleName::from_static("menu"))).join();
        assert!(outcome.is_err());

        assert!(shared.resolve(&ModuleName::from_static("storage")).is_ok());
        assert!(!shared.with(|composer| composer.is_initialized("menu")));
    }
}
