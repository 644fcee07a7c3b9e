//! Request dispatch.
//!
//! Handlers are bound to request types once at startup in a
//! [`HandlerRegistry`], which is then frozen into a [`Dispatcher`]. Callers
//! hand the dispatcher any request value and get back the response type the
//! request declares, without naming the handler.
//!
//! The dispatcher memoizes resolved routes in a concurrent map keyed by
//! request type. The map is insert-only: concurrent first dispatches of the
//! same type may both resolve the route, and both converge on one cached
//! entry. Each dispatch call still invokes its handler exactly once.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{DispatchError, DomainError, RegistryError};

/// A command or query. The response type is fixed per request type.
pub trait Request: Send + 'static {
    /// What handling this request produces.
    type Response: Send + 'static;
}

/// Processes one request type.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    /// Handles `request`, observing `cancel` at I/O boundaries.
    async fn handle(&self, request: R, cancel: &CancellationToken)
    -> Result<R::Response, DomainError>;
}

type HandlerFactory<R> = dyn Fn() -> Arc<dyn Handler<R>> + Send + Sync;

/// How a request type obtains its handler.
enum Binding<R: Request> {
    /// One instance serves every dispatch.
    Shared(Arc<dyn Handler<R>>),
    /// A fresh instance per dispatch.
    Factory(Arc<HandlerFactory<R>>),
}

impl<R: Request> Binding<R> {
    fn resolve(&self) -> Arc<dyn Handler<R>> {
        match self {
            Self::Shared(handler) => Arc::clone(handler),
            Self::Factory(factory) => factory(),
        }
    }
}

/// Type-erased binding. `binding` always holds a `Binding<R>` where `R` is
/// the request type whose `TypeId` keys this route.
struct Route {
    request: &'static str,
    binding: Arc<dyn Any + Send + Sync>,
}

/// Startup-time map from request type to handler.
#[derive(Default)]
pub struct HandlerRegistry {
    routes: HashMap<TypeId, Arc<Route>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to request type `R`; the instance is shared by every
    /// dispatch.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateHandler` if `R` already has a
    /// handler.
    pub fn register<R, H>(&mut self, handler: H) -> Result<&mut Self, RegistryError>
    where
        R: Request,
        H: Handler<R> + 'static,
    {
        self.bind::<R>(Binding::Shared(Arc::new(handler)))
    }

    /// Binds `factory` to request type `R`; each dispatch gets a fresh
    /// handler.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateHandler` if `R` already has a
    /// handler.
    pub fn register_factory<R, H, F>(&mut self, factory: F) -> Result<&mut Self, RegistryError>
    where
        R: Request,
        H: Handler<R> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory: Arc<HandlerFactory<R>> =
            Arc::new(move || Arc::new(factory()) as Arc<dyn Handler<R>>);
        self.bind::<R>(Binding::Factory(factory))
    }

    fn bind<R: Request>(&mut self, binding: Binding<R>) -> Result<&mut Self, RegistryError> {
        let request = type_name::<R>();
        let key = TypeId::of::<R>();
        if self.routes.contains_key(&key) {
            return Err(RegistryError::DuplicateHandler { request });
        }
        self.routes.insert(
            key,
            Arc::new(Route {
                request,
                binding: Arc::new(binding),
            }),
        );
        debug!(request, "registered request handler");
        Ok(self)
    }

    /// Whether request type `R` has a handler.
    #[must_use]
    pub fn contains<R: Request>(&self) -> bool {
        self.routes.contains_key(&TypeId::of::<R>())
    }

    /// Number of bound request types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no request type is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Freezes the registry. No handler can be added afterwards.
    #[must_use]
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher {
            registry: self,
            resolved: DashMap::new(),
        }
    }
}

/// Routes requests to their bound handler. Safe to share across tasks.
pub struct Dispatcher {
    registry: HandlerRegistry,
    resolved: DashMap<TypeId, Arc<Route>>,
}

impl Dispatcher {
    /// Dispatches `request` to the handler bound to its type.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::HandlerNotFound` if no handler is bound to
    /// `R` (a wiring bug), `DispatchError::BindingMismatch` if the route for
    /// `R` holds a binding of another type, or `DispatchError::Handler` with
    /// the handler's own failure.
    pub async fn dispatch<R: Request>(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> Result<R::Response, DispatchError> {
        let handler = self.resolve::<R>()?;
        Ok(handler.handle(request, cancel).await?)
    }

    fn resolve<R: Request>(&self) -> Result<Arc<dyn Handler<R>>, DispatchError> {
        let key = TypeId::of::<R>();
        let cached = self.resolved.get(&key).map(|route| Arc::clone(route.value()));
        let route = if let Some(route) = cached {
            route
        } else {
            let Some(route) = self.registry.routes.get(&key) else {
                let request = type_name::<R>();
                error!(request, "no handler registered for request type");
                return Err(DispatchError::HandlerNotFound { request });
            };
            debug!(request = route.request, "resolved handler route");
            let entry = self.resolved.entry(key).or_insert_with(|| Arc::clone(route));
            Arc::clone(entry.value())
        };

        let Some(binding) = route.binding.downcast_ref::<Binding<R>>() else {
            let request = type_name::<R>();
            error!(request, "cached route holds a binding for another request type");
            return Err(DispatchError::BindingMismatch { request });
        };
        Ok(binding.resolve())
    }

    /// Number of request types resolved so far.
    #[must_use]
    pub fn cached_routes(&self) -> usize {
        self.resolved.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Echo(String);

    impl Request for Echo {
        type Response = String;
    }

    #[derive(Debug)]
    struct Add(u32, u32);

    impl Request for Add {
        type Response = u32;
    }

    #[derive(Debug)]
    struct Unbound;

    impl Request for Unbound {
        type Response = ();
    }

    #[derive(Default)]
    struct EchoHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Handler<Echo> for EchoHandler {
        async fn handle(&self, request: Echo, _cancel: &CancellationToken) -> Result<String, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("handled {}", request.0))
        }
    }

    struct AddHandler;

    #[async_trait]
    impl Handler<Add> for AddHandler {
        async fn handle(&self, request: Add, _cancel: &CancellationToken) -> Result<u32, DomainError> {
            if request.1 == 0 {
                return Err(DomainError::Validation("rhs must be positive".into()));
            }
            Ok(request.0 + request.1)
        }
    }

    #[tokio::test]
    async fn test_dispatch_invokes_bound_handler_once_and_returns_its_result() {
        // Arrange
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Echo, _>(EchoHandler {
                calls: Arc::clone(&calls),
            })
            .unwrap();
        let dispatcher = registry.into_dispatcher();

        // Act
        let response = dispatcher
            .dispatch(Echo("ping".into()), &CancellationToken::new())
            .await
            .unwrap();

        // Assert
        assert_eq!(response, "handled ping");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_routes_each_request_type_to_its_own_handler() {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Echo, _>(EchoHandler::default())
            .unwrap()
            .register::<Add, _>(AddHandler)
            .unwrap();
        let dispatcher = registry.into_dispatcher();
        let cancel = CancellationToken::new();

        assert_eq!(dispatcher.dispatch(Add(2, 3), &cancel).await.unwrap(), 5);
        assert_eq!(
            dispatcher.dispatch(Echo("x".into()), &cancel).await.unwrap(),
            "handled x"
        );
        assert_eq!(dispatcher.cached_routes(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_of_unbound_request_fails_with_handler_not_found() {
        let dispatcher = HandlerRegistry::new().into_dispatcher();

        let result = dispatcher.dispatch(Unbound, &CancellationToken::new()).await;

        match result {
            Err(DispatchError::HandlerNotFound { request }) => assert!(request.ends_with("Unbound")),
            other => panic!("expected HandlerNotFound, got {other:?}"),
        }
        assert_eq!(dispatcher.cached_routes(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_surfaces_handler_error() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Add, _>(AddHandler).unwrap();
        let dispatcher = registry.into_dispatcher();

        let result = dispatcher.dispatch(Add(1, 0), &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(DispatchError::Handler(DomainError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_route_with_a_foreign_binding_fails_without_panicking() {
        // Arrange
        let mut registry = HandlerRegistry::new();
        registry.routes.insert(
            TypeId::of::<Echo>(),
            Arc::new(Route {
                request: type_name::<Echo>(),
                binding: Arc::new(Binding::<Add>::Shared(Arc::new(AddHandler))),
            }),
        );
        let dispatcher = registry.into_dispatcher();

        // Act
        let result = dispatcher.dispatch(Echo("x".into()), &CancellationToken::new()).await;

        // Assert
        match result {
            Err(DispatchError::BindingMismatch { request }) => assert!(request.ends_with("Echo")),
            other => panic!("expected BindingMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_registering_a_request_type_twice_is_a_configuration_error() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Add, _>(AddHandler).unwrap();

        let result = registry.register::<Add, _>(AddHandler).map(|_| ());

        assert!(matches!(
            result,
            Err(RegistryError::DuplicateHandler { request }) if request.ends_with("Add")
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_factory_and_instance_registrations_share_the_uniqueness_rule() {
        let mut registry = HandlerRegistry::new();
        registry.register_factory::<Add, _, _>(|| AddHandler).unwrap();

        assert!(registry.register::<Add, _>(AddHandler).is_err());
        assert!(registry.contains::<Add>());
        assert!(!registry.contains::<Echo>());
    }

    #[tokio::test]
    async fn test_factory_builds_a_handler_per_dispatch() {
        let built = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        {
            let built = Arc::clone(&built);
            let calls = Arc::clone(&calls);
            registry
                .register_factory::<Echo, _, _>(move || {
                    built.fetch_add(1, Ordering::SeqCst);
                    EchoHandler {
                        calls: Arc::clone(&calls),
                    }
                })
                .unwrap();
        }
        let dispatcher = registry.into_dispatcher();
        let cancel = CancellationToken::new();

        dispatcher.dispatch(Echo("a".into()), &cancel).await.unwrap();
        dispatcher.dispatch(Echo("b".into()), &cancel).await.unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.cached_routes(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_dispatches_each_invoke_the_handler_once() {
        // Arrange
        const TASKS: usize = 32;
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Echo, _>(EchoHandler {
                calls: Arc::clone(&calls),
            })
            .unwrap();
        let dispatcher = Arc::new(registry.into_dispatcher());
        assert_eq!(dispatcher.cached_routes(), 0);

        // Act
        let tasks: Vec<_> = (0..TASKS)
            .map(|i| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    dispatcher
                        .dispatch(Echo(i.to_string()), &CancellationToken::new())
                        .await
                })
            })
            .collect();
        let mut responses = Vec::with_capacity(TASKS);
        for task in tasks {
            responses.push(task.await.unwrap().unwrap());
        }

        // Assert
        assert_eq!(responses.len(), TASKS);
        assert_eq!(calls.load(Ordering::SeqCst), TASKS);
        assert_eq!(dispatcher.cached_routes(), 1);
    }
}
