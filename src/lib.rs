//! GlowGuide — multi-stage skin-advisory workflow core.

pub mod acquire;
pub mod analysis;
pub mod chat;
pub mod config;
pub mod directory;
pub mod error;
pub mod location;
pub mod report;
pub mod services;
pub mod session;
pub mod stage;
