//! User profile module for the SkillUp client

pub mod models;
mod service;

pub use models::{BadgeLevel, UpdateUserProfileRequest, UserAchievement, UserProfile, UserStatistics};
pub use service::UserService;
