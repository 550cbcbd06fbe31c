//! Headless view controllers. Each owns its own view state and exposes event handlers;
//! rendering is left to the front-end.

pub mod browse;
pub mod composer;
pub mod selection;

pub use browse::{BrowseState, BrowseView, FilterChange, ListRequest, LoadOutcome, Preview, PreviewRequest};
pub use composer::{ComposerView, EditorTab};
pub use selection::{PanelVisibility, SelectionPanel};
