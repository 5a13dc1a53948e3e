use async_trait::async_trait;

/// Error signaled by a handler to abort the rest of its pipeline.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single handler invocation.
///
/// Returning `Ok(())` hands control to the next handler exactly once;
/// returning `Err` aborts the current phase and every later phase.
pub type HookResult = Result<(), HookError>;

/// A handler registered on a phase sub-stage.
///
/// Handlers receive the pipeline's mutable context and may run synchronous
/// or asynchronous logic before yielding control. Only one handler executes
/// at a time for a given call, so the context can be mutated freely.
#[async_trait]
pub trait PhaseHandler<C>: Send + Sync {
    async fn handle(&self, ctx: &mut C) -> HookResult;
}

/// Adapter that lifts a synchronous closure into a [`PhaseHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<C, F> PhaseHandler<C> for FnHandler<F>
where
    C: Send + 'static,
    F: Fn(&mut C) -> HookResult + Send + Sync,
{
    async fn handle(&self, ctx: &mut C) -> HookResult {
        (self.0)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx {
        count: u32,
    }

    #[tokio::test]
    async fn fn_handler_mutates_context() {
        let handler = FnHandler(|ctx: &mut Ctx| {
            ctx.count += 1;
            Ok(())
        });

        let mut ctx = Ctx { count: 0 };
        handler.handle(&mut ctx).await.unwrap();
        handler.handle(&mut ctx).await.unwrap();
        assert_eq!(ctx.count, 2);
    }

    #[tokio::test]
    async fn fn_handler_propagates_errors() {
        let handler = FnHandler(|_: &mut Ctx| Err("boom".into()));

        let mut ctx = Ctx { count: 0 };
        let err = handler.handle(&mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
