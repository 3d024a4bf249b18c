//! # slot-engine
//!
//! Scheduling core for timed social posts.
//!
//! The engine merges a recurring weekly availability schedule with ad-hoc
//! posts into a per-day slot grid, decides which days and slots are open
//! under layered enable/disable rules, resolves literal wall-clock times
//! against named IANA zones, and matches due posts for dispatch without
//! double-posting.
//!
//! ## Modules
//!
//! - [`temporal`]: civil date + wall-clock time + zone → instant, and back for display
//! - [`availability`]: day and slot activity under weekly rules
//! - [`grid`]: rolling per-day slot grid built from rules and posts
//! - [`projection`]: immutable optimistic board with rollback
//! - [`lifecycle`]: create, edit, reschedule, copy, delete, pause, activate
//! - [`dispatch`]: due-window matching and the guarded publish cycle
//! - [`store`]: record store trait and an in-memory implementation
//! - [`publish`]: publish adapter contract
//! - [`config`]: TOML configuration
//! - [`model`] / [`error`]: shared types

pub mod availability;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod grid;
pub mod lifecycle;
pub mod model;
pub mod projection;
pub mod publish;
pub mod store;
pub mod temporal;

pub use availability::{is_day_active, is_slot_active};
pub use config::{DispatchConfig, EngineConfig, GridConfig, LoggingConfig};
pub use dispatch::{
    due_window, is_due, select_due, DispatchOutcome, DispatchReport, Dispatcher, DueWindow,
};
pub use error::{Result, ScheduleError};
pub use grid::{build_grid, build_grid_at, DaySchedule, GridWarning, SlotGrid, SlotView};
pub use lifecycle::{EditorContext, NewPostInput, PendingCreate, PostLifecycleManager, PostPatch};
pub use model::{
    AvailabilityRule, ChannelAccount, Credentials, DayOfWeek, PostId, PostStatus, ScheduledPost,
    SlotKey, SocialChannel,
};
pub use projection::{BoardEvent, ScheduleBoard};
pub use publish::{
    DryRunPublisher, PublishReceipt, PublishRequest, Publisher, PublisherRegistry,
};
pub use store::{MemoryStore, PostFilter, ScheduleStore, UpdateGuard};
pub use temporal::{
    format_in_zone, render_in_zone_or_raw, resolve_local, shift_instant, to_absolute_instant,
    Disambiguation, LocalResolution,
};
