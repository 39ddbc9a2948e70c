//! Virtualized page viewer core.
//!
//! Decides which pages of a long document are mounted while the user scrolls
//! and zooms, picks the current page from measured visibility, keeps the
//! content under the pointer still across scale changes, and drives per-page
//! renders through [`pdfmask_scheduler`].
//!
//! ```
//! use pdfmask_engine::testing::letter_pdf;
//! use pdfmask_scheduler::InlineExecutor;
//! use pdfmask_viewer::{SimulatedScrollHost, Viewer, ViewerConfig};
//! use std::time::Instant;
//!
//! let mut viewer = Viewer::new(ViewerConfig::default(), Box::new(InlineExecutor::new())).unwrap();
//! let mut host = SimulatedScrollHost::new(800.0, 600.0);
//! let now = Instant::now();
//!
//! viewer.load_bytes(letter_pdf(12), &mut host, now).unwrap();
//! viewer.tick(&mut host, now);
//! viewer.pump_until_idle(now);
//!
//! assert_eq!(viewer.current_page().current_page_number, 1);
//! assert_eq!(viewer.render_window().to_vec(), vec![0, 1, 2, 3, 4, 5]);
//! ```

pub mod config;
pub mod edits;
pub mod error;
pub mod events;
pub mod geometry;
pub mod layout;
pub mod pages;
pub mod scale;
pub mod scroll;
pub mod visibility;
pub mod window;

mod viewer;

pub use config::{ConfigError, ViewerConfig};
pub use edits::{EditSession, Mask, MaskId, ResizeHandle};
pub use error::{Result, ViewerError};
pub use events::{EventBus, ScrollDirection, SubscriptionId, ViewerEvent};
pub use geometry::{binary_search_first, rank_by_visibility, visible_percent, Point, Rect, VisibilityEntry};
pub use layout::PageLayout;
pub use pages::PageCache;
pub use scale::{ScaleChange, ScaleController};
pub use scroll::{ScrollCoordinator, ScrollHost, SimulatedScrollHost, ZoomAnchor};
pub use viewer::{LoadState, Viewer};
pub use visibility::{CurrentPageState, VisibilitySnapshot, VisibilityTracker};
pub use window::{PageWindowManager, RenderWindow, WindowDiff};
