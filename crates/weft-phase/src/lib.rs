//! Ordered, named phase lists with before/use/after sub-stages.
//!
//! A [`PhaseList`] is an ordered sequence of named [`Phase`]s, anchored by the
//! always-present `initial` (first) and `final` (last) phases. Each phase
//! holds three FIFO handler queues, one per [`SubStage`], executed strictly in
//! `Before` → `Use` → `After` order. Handlers run sequentially: a handler
//! must complete before the next one begins, and the first error aborts the
//! remainder of the list.
//!
//! The crate is generic over the context type `C` that handlers mutate, so
//! the same engine drives both request-side and response-side pipelines.
//!
//! ```ignore
//! let mut list: PhaseList<Ctx> = PhaseList::with_phases(["auth", "sign"])?;
//! list.find_mut("auth")
//!     .unwrap()
//!     .register(SubStage::Use, Arc::new(FnHandler(|ctx: &mut Ctx| {
//!         ctx.token = Some("...".into());
//!         Ok(())
//!     })));
//! list.run(&mut ctx).await?;
//! ```

mod handler;
mod list;
mod phase;
mod stage;

pub use handler::*;
pub use list::*;
pub use phase::*;
pub use stage::*;
