//! X11 platform adapters.

mod clipboard;

pub use clipboard::XclipProvider;
