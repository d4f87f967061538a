//! Shared UI theme constants.

use ratatui::style::Color;

// Card accents: CPU blue, memory green, disk orange
pub const CPU: Color = Color::Rgb(59, 130, 246);
pub const MEMORY: Color = Color::Rgb(16, 185, 129);
pub const DISK: Color = Color::Rgb(249, 115, 22);

pub const ACCENT: Color = Color::Rgb(147, 197, 253);
pub const MUTED: Color = Color::Rgb(120, 120, 130);
pub const SELECTED_BG: Color = Color::Rgb(40, 48, 64);
pub const ERROR: Color = Color::Rgb(248, 113, 113);

// Scrollbar colors
pub const SB_ARROW: Color = Color::Rgb(170, 170, 180);
pub const SB_TRACK: Color = Color::Rgb(90, 90, 100);
pub const SB_THUMB: Color = Color::Rgb(170, 170, 180);
