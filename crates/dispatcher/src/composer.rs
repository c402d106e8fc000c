//! Composer - one record, many handlers
//!
//! A [`Composer`] is itself a [`DeliveryHandler`], so compositions nest freely.
//! It never retries, suppresses or logs: every child failure is returned to the
//! caller inside one [`AggregateError`], ordered by handler position.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::{JoinError, JoinSet};

use contracts::{
    AggregateError, DeliveryContext, DeliveryError, DeliveryHandler, Record, SharedHandler,
};

/// How a composer drives its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One at a time, in construction order, without short-circuit
    #[default]
    Sequence,
    /// All at once, joined before returning
    FanOut,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::FanOut => "fan_out",
        }
    }
}

/// Handler that delivers a record to every child handler
#[derive(Clone)]
pub struct Composer {
    name: String,
    mode: DispatchMode,
    handlers: Arc<[SharedHandler]>,
}

impl Composer {
    /// Create a composer with the given mode
    pub fn new(mode: DispatchMode, handlers: impl IntoIterator<Item = SharedHandler>) -> Self {
        Self {
            name: mode.as_str().to_string(),
            mode,
            handlers: handlers.into_iter().collect(),
        }
    }

    /// Sequential composer
    pub fn sequence(handlers: impl IntoIterator<Item = SharedHandler>) -> Self {
        Self::new(DispatchMode::Sequence, handlers)
    }

    /// Concurrent composer
    pub fn fan_out(handlers: impl IntoIterator<Item = SharedHandler>) -> Self {
        Self::new(DispatchMode::FanOut, handlers)
    }

    /// Override the composer name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Child handlers in construction order
    pub fn handlers(&self) -> &[SharedHandler] {
        &self.handlers
    }

    /// Share as a [`SharedHandler`]
    pub fn into_shared(self) -> SharedHandler {
        Arc::new(self)
    }

    async fn deliver_sequence(
        &self,
        ctx: &DeliveryContext,
        record: &Record,
    ) -> Result<(), DeliveryError> {
        let mut failures = AggregateError::new();
        for handler in self.handlers.iter() {
            if let Err(e) = handler.deliver(ctx, record).await {
                failures.push(e);
            }
        }
        failures.into_result()
    }

    async fn deliver_fan_out(
        &self,
        ctx: &DeliveryContext,
        record: &Record,
    ) -> Result<(), DeliveryError> {
        if self.handlers.is_empty() {
            return Ok(());
        }

        let record = Arc::new(record.clone());
        // Dropping the set aborts any task still running.
        let mut tasks = JoinSet::new();
        let mut task_index = Vec::with_capacity(self.handlers.len());

        for (index, handler) in self.handlers.iter().enumerate() {
            let handler = Arc::clone(handler);
            let ctx = ctx.clone();
            let record = Arc::clone(&record);
            let abort = tasks.spawn(async move { (index, handler.deliver(&ctx, &record).await) });
            task_index.push((abort.id(), index));
        }

        let mut slots: Vec<Option<DeliveryError>> = Vec::new();
        slots.resize_with(self.handlers.len(), || None);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((index, Err(e))) => slots[index] = Some(e),
                Err(join_err) => {
                    let Some(&(_, index)) = task_index.iter().find(|(id, _)| *id == join_err.id())
                    else {
                        continue;
                    };
                    slots[index] = Some(join_failure(self.handlers[index].name(), join_err));
                }
            }
        }

        slots.into_iter().flatten().collect::<AggregateError>().into_result()
    }
}

fn join_failure(handler: &str, err: JoinError) -> DeliveryError {
    let handler = handler.to_string();
    if err.is_panic() {
        DeliveryError::Panicked {
            handler,
            message: panic_message(err.into_panic()),
        }
    } else {
        DeliveryError::Cancelled { handler }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("Composer")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("handlers", &names)
            .finish()
    }
}

#[async_trait]
impl DeliveryHandler for Composer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        match self.mode {
            DispatchMode::Sequence => self.deliver_sequence(ctx, record).await,
            DispatchMode::FanOut => self.deliver_fan_out(ctx, record).await,
        }
    }
}
