//! UI module root: exposes drawing functions for individual panels.

pub mod cards;
pub mod cpu;
pub mod detail;
pub mod disks;
pub mod header;
pub mod processes;
pub mod raw;
pub mod settings;
pub mod sidebar;
pub mod status;
pub mod theme;
pub mod util;
