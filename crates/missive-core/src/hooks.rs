//! Before/after hooks and error interceptors around a [`Service`].
//!
//! [`HookPipeline`] runs each call through three stages:
//!
//! 1. Before hooks registered for the method, in registration order.
//!    Each receives the [`HookContext`] and returns it (possibly
//!    modified) or an error.
//! 2. The service method itself, unless a before hook already set
//!    [`HookContext::result`].
//! 3. After hooks registered for the method, in registration order.
//!
//! Any error from any stage stops the chain. Error hooks then see it,
//! along with the resource path, method, and a captured backtrace, and
//! the error is returned to the caller unchanged.

use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::error::ServiceError;
use crate::ids::MessageId;
use crate::message::{MessageData, Outcome, Params};
use crate::service::{Service, ServiceMethod};

/// When a hook runs relative to the service method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookPhase {
    /// Before the method; may modify the payload.
    Before,
    /// After the method succeeded; may modify the result.
    After,
}

/// State threaded through hooks and the service method for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct HookContext {
    /// Resource path the call targets (e.g. `messages`).
    pub path: String,
    /// Method being called.
    pub method: ServiceMethod,
    /// Record id for `update`, `patch`, and `remove`.
    pub id: Option<MessageId>,
    /// Payload for `create`, `update`, and `patch`.
    pub data: Option<MessageData>,
    /// Call metadata.
    pub params: Params,
    /// Method result. Set by the pipeline after the method runs; a before
    /// hook that sets it skips the method.
    pub result: Option<Outcome>,
}

impl HookContext {
    /// Start a context for a call with no id and no payload.
    pub fn new(path: impl Into<String>, method: ServiceMethod, params: Params) -> Self {
        Self {
            path: path.into(),
            method,
            id: None,
            data: None,
            params,
            result: None,
        }
    }

    /// Attach a record id.
    #[must_use]
    pub fn with_id(mut self, id: Option<MessageId>) -> Self {
        self.id = id;
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: MessageData) -> Self {
        self.data = Some(data);
        self
    }
}

/// A before or after interceptor.
///
/// Implemented for any `Fn(HookContext) -> Result<HookContext, ServiceError>`
/// so closures can be registered directly.
pub trait Hook: Send + Sync {
    /// Run the hook, returning the context to pass on.
    fn run(&self, context: HookContext) -> Result<HookContext, ServiceError>;
}

impl<F> Hook for F
where
    F: Fn(HookContext) -> Result<HookContext, ServiceError> + Send + Sync,
{
    fn run(&self, context: HookContext) -> Result<HookContext, ServiceError> {
        self(context)
    }
}

/// What an error hook gets to see about a failed call.
#[derive(Debug)]
pub struct ErrorContext<'a> {
    /// Resource path of the failed call.
    pub path: &'a str,
    /// Method of the failed call.
    pub method: ServiceMethod,
    /// Record id, if the call had one.
    pub id: Option<MessageId>,
    /// The error that will be returned to the caller.
    pub error: &'a ServiceError,
    /// Backtrace captured where the failure was reported.
    pub trace: &'a Backtrace,
}

/// An interceptor notified of every failed call. It cannot alter the error.
pub trait ErrorHook: Send + Sync {
    /// Observe a failure.
    fn on_error(&self, context: &ErrorContext<'_>);
}

/// Payload field a [`SetTimestamp`] hook writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    /// `createdAt`.
    CreatedAt,
    /// `updatedAt`.
    UpdatedAt,
}

impl TimestampField {
    /// Wire name of the field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }
}

/// Before hook that stamps the current time into the payload.
///
/// Any value already present is overwritten. A missing payload is
/// replaced with an empty one so the stamp is never lost.
#[derive(Debug, Clone, Copy)]
pub struct SetTimestamp {
    field: TimestampField,
}

impl SetTimestamp {
    /// Stamp the given field.
    pub const fn new(field: TimestampField) -> Self {
        Self { field }
    }
}

impl Hook for SetTimestamp {
    fn run(&self, mut context: HookContext) -> Result<HookContext, ServiceError> {
        let now = Utc::now();
        let data = context.data.get_or_insert_with(MessageData::default);
        match self.field {
            TimestampField::CreatedAt => data.created_at = Some(now),
            TimestampField::UpdatedAt => data.updated_at = Some(now),
        }
        debug!(
            path = %context.path,
            method = %context.method,
            field = self.field.as_str(),
            at = %now,
            "Timestamp set"
        );
        Ok(context)
    }
}

/// Error hook that logs the failing path, method, and backtrace.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrors;

impl ErrorHook for LogErrors {
    fn on_error(&self, context: &ErrorContext<'_>) {
        error!(
            path = context.path,
            method = %context.method,
            id = ?context.id,
            error = %context.error,
            trace = %context.trace,
            "Error in '{}' service method '{}'",
            context.path,
            context.method
        );
    }
}

/// A service wrapped with ordered hooks.
pub struct HookPipeline<S> {
    path: String,
    service: S,
    hooks: BTreeMap<(HookPhase, ServiceMethod), Vec<Arc<dyn Hook>>>,
    error_hooks: Vec<Arc<dyn ErrorHook>>,
}

impl<S: Service> HookPipeline<S> {
    /// Wrap `service`, mounted at `path`, with no hooks.
    pub fn new(path: impl Into<String>, service: S) -> Self {
        Self {
            path: path.into(),
            service,
            hooks: BTreeMap::new(),
            error_hooks: Vec::new(),
        }
    }

    /// Resource path this pipeline serves.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The wrapped service.
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// Append a hook for `method` in `phase`.
    pub fn register(
        &mut self,
        phase: HookPhase,
        method: ServiceMethod,
        hook: impl Hook + 'static,
    ) -> &mut Self {
        self.hooks
            .entry((phase, method))
            .or_default()
            .push(Arc::new(hook));
        self
    }

    /// Append a before hook for `method`.
    pub fn before(&mut self, method: ServiceMethod, hook: impl Hook + 'static) -> &mut Self {
        self.register(HookPhase::Before, method, hook)
    }

    /// Append an after hook for `method`.
    pub fn after(&mut self, method: ServiceMethod, hook: impl Hook + 'static) -> &mut Self {
        self.register(HookPhase::After, method, hook)
    }

    /// Append an error hook. Error hooks apply to every method.
    pub fn on_error(&mut self, hook: impl ErrorHook + 'static) -> &mut Self {
        self.error_hooks.push(Arc::new(hook));
        self
    }

    /// Number of hooks registered for `method` in `phase`.
    pub fn hook_count(&self, phase: HookPhase, method: ServiceMethod) -> usize {
        self.hooks.get(&(phase, method)).map_or(0, Vec::len)
    }

    /// Run a call through before hooks, the service, and after hooks.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a hook or the service, after
    /// every error hook has seen it.
    pub fn call(&self, context: HookContext) -> Result<Outcome, ServiceError> {
        let method = context.method;
        let id = context.id;
        match self.run(context) {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.report(method, id, &error);
                Err(error)
            }
        }
    }

    fn run(&self, mut context: HookContext) -> Result<Outcome, ServiceError> {
        for hook in self.chain(HookPhase::Before, context.method) {
            context = hook.run(context)?;
        }

        if context.result.is_none() {
            context.result = Some(self.dispatch(&context)?);
        }

        for hook in self.chain(HookPhase::After, context.method) {
            context = hook.run(context)?;
        }

        context.result.ok_or_else(|| {
            ServiceError::Internal(String::from("hook cleared the call result"))
        })
    }

    fn dispatch(&self, context: &HookContext) -> Result<Outcome, ServiceError> {
        let params = &context.params;
        let data = || context.data.clone().unwrap_or_default();
        match context.method {
            ServiceMethod::Find => self.service.find(params).map(Outcome::Collection),
            ServiceMethod::Create => self.service.create(data(), params).map(Outcome::Record),
            ServiceMethod::Update => self
                .service
                .update(context.id, data(), params)
                .map(Outcome::Record),
            ServiceMethod::Patch => self
                .service
                .patch(context.id, data(), params)
                .map(Outcome::Record),
            ServiceMethod::Remove => self
                .service
                .remove(context.id, params)
                .map(Outcome::Collection),
        }
    }

    fn chain(&self, phase: HookPhase, method: ServiceMethod) -> impl Iterator<Item = &Arc<dyn Hook>> {
        self.hooks.get(&(phase, method)).into_iter().flatten()
    }

    fn report(&self, method: ServiceMethod, id: Option<MessageId>, error: &ServiceError) {
        // Captured regardless of RUST_BACKTRACE so every report carries a trace.
        let trace = Backtrace::force_capture();
        let context = ErrorContext {
            path: &self.path,
            method,
            id,
            error,
            trace: &trace,
        };
        for hook in &self.error_hooks {
            hook.on_error(&context);
        }
    }
}

impl<S> core::fmt::Debug for HookPipeline<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookPipeline")
            .field("path", &self.path)
            .field("hooks", &self.hooks.iter().map(|(k, v)| (*k, v.len())).collect::<Vec<_>>())
            .field("error_hooks", &self.error_hooks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::backtrace::BacktraceStatus;
    use std::sync::Mutex;

    use super::*;
    use crate::message::Message;
    use crate::service::MessageService;

    fn pipeline() -> HookPipeline<MessageService> {
        HookPipeline::new("messages", MessageService::default())
    }

    fn create_context(text: &str) -> HookContext {
        HookContext::new("messages", ServiceMethod::Create, Params::default())
            .with_data(MessageData::new(text))
    }

    type HookResult = Result<HookContext, ServiceError>;

    /// Records `(path, method)` for every error it sees.
    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<(String, ServiceMethod)>>>);

    impl ErrorHook for Recorder {
        fn on_error(&self, context: &ErrorContext<'_>) {
            self.0
                .lock()
                .unwrap()
                .push((context.path.to_owned(), context.method));
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<(String, ServiceMethod)>>>, Recorder) {
        let hook = Recorder::default();
        (Arc::clone(&hook.0), hook)
    }

    #[test]
    fn set_timestamp_stamps_created_at() {
        let before = Utc::now();
        let ctx = SetTimestamp::new(TimestampField::CreatedAt)
            .run(create_context("hi"))
            .unwrap();
        let data = ctx.data.unwrap();
        assert!(data.created_at.unwrap() >= before);
        assert!(data.updated_at.is_none());
    }

    #[test]
    fn set_timestamp_fills_missing_payload() {
        let ctx = HookContext::new("messages", ServiceMethod::Update, Params::default());
        let ctx = SetTimestamp::new(TimestampField::UpdatedAt).run(ctx).unwrap();
        assert!(ctx.data.unwrap().updated_at.is_some());
    }

    #[test]
    fn before_hooks_run_in_registration_order() {
        let mut pipeline = pipeline();
        pipeline
            .before(ServiceMethod::Create, |mut ctx: HookContext| -> HookResult {
                if let Some(data) = ctx.data.as_mut() {
                    data.text = data.text.take().map(|t| format!("{t}-one"));
                }
                Ok(ctx)
            })
            .before(ServiceMethod::Create, |mut ctx: HookContext| -> HookResult {
                if let Some(data) = ctx.data.as_mut() {
                    data.text = data.text.take().map(|t| format!("{t}-two"));
                }
                Ok(ctx)
            });
        let message = pipeline.call(create_context("x")).unwrap().into_record().unwrap();
        assert_eq!(message.text, "x-one-two");
    }

    #[test]
    fn failing_before_hook_skips_service_and_reports() {
        let (seen, hook) = recorder();
        let mut pipeline = pipeline();
        pipeline
            .before(ServiceMethod::Create, |_ctx: HookContext| -> HookResult {
                Err(ServiceError::Internal(String::from("boom")))
            })
            .on_error(hook);

        let err = pipeline.call(create_context("hi")).unwrap_err();
        assert_eq!(err, ServiceError::Internal(String::from("boom")));
        assert_eq!(pipeline.service().count().unwrap(), 0);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(String::from("messages"), ServiceMethod::Create)]
        );
    }

    #[test]
    fn service_errors_reach_error_hooks_unchanged() {
        let (seen, hook) = recorder();
        let mut pipeline = pipeline();
        pipeline.on_error(hook);

        let ctx = HookContext::new("messages", ServiceMethod::Create, Params::default());
        let err = pipeline.call(ctx).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    /// Records the backtrace status of every error it sees.
    #[derive(Default, Clone)]
    struct TraceRecorder(Arc<Mutex<Vec<BacktraceStatus>>>);

    impl ErrorHook for TraceRecorder {
        fn on_error(&self, context: &ErrorContext<'_>) {
            self.0.lock().unwrap().push(context.trace.status());
        }
    }

    #[test]
    fn error_hooks_receive_a_captured_backtrace() {
        let hook = TraceRecorder::default();
        let seen = Arc::clone(&hook.0);
        let mut pipeline = pipeline();
        pipeline.on_error(hook);

        let ctx = HookContext::new("messages", ServiceMethod::Create, Params::default());
        pipeline.call(ctx).unwrap_err();
        assert_eq!(*seen.lock().unwrap(), vec![BacktraceStatus::Captured]);
    }

    #[test]
    fn successful_calls_do_not_reach_error_hooks() {
        let (seen, hook) = recorder();
        let mut pipeline = pipeline();
        pipeline.on_error(hook);
        pipeline.call(create_context("hi")).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn after_hooks_see_the_result() {
        let mut pipeline = pipeline();
        pipeline.after(ServiceMethod::Create, |mut ctx: HookContext| -> HookResult {
            if let Some(Outcome::Record(message)) = ctx.result.as_mut() {
                message.text = message.text.to_uppercase();
            }
            Ok(ctx)
        });
        let message = pipeline.call(create_context("hi")).unwrap().into_record().unwrap();
        assert_eq!(message.text, "HI");
        // The stored copy is untouched.
        let stored = pipeline.service().find(&Params::default()).unwrap();
        assert_eq!(stored.first().unwrap().text, "hi");
    }

    #[test]
    fn before_hook_result_skips_service() {
        let mut pipeline = pipeline();
        pipeline.before(ServiceMethod::Create, |mut ctx: HookContext| -> HookResult {
            ctx.result = Some(Outcome::Record(Message {
                id: MessageId(99),
                text: String::from("cached"),
                created_at: None,
                updated_at: None,
            }));
            Ok(ctx)
        });
        let message = pipeline.call(create_context("hi")).unwrap().into_record().unwrap();
        assert_eq!(message.id, MessageId(99));
        assert_eq!(pipeline.service().count().unwrap(), 0);
    }

    #[test]
    fn hooks_are_scoped_to_their_method() {
        let mut pipeline = pipeline();
        pipeline.before(ServiceMethod::Remove, |_ctx: HookContext| -> HookResult {
            Err(ServiceError::Internal(String::from("remove only")))
        });
        assert!(pipeline.call(create_context("hi")).is_ok());
        let ctx = HookContext::new("messages", ServiceMethod::Remove, Params::default())
            .with_id(Some(MessageId(0)));
        assert!(pipeline.call(ctx).is_err());
        assert_eq!(pipeline.hook_count(HookPhase::Before, ServiceMethod::Remove), 1);
        assert_eq!(pipeline.hook_count(HookPhase::After, ServiceMethod::Remove), 0);
    }
}
