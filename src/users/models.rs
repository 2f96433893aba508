use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub study_year: Option<i32>,
    #[serde(default)]
    pub career_goals: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub linked_in_url: Option<String>,
    #[serde(default)]
    pub git_hub_url: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

/// Partial profile update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_in_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_hub_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStatistics {
    pub completed_courses: u32,
    pub assessments_passed: u32,
    pub total_skill_points: u32,
    pub learning_paths_started: u32,
    pub average_assessment_score: f64,
    /// Hours.
    pub time_spent_learning: f64,
    pub achievements_unlocked: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeLevel {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    pub unlocked_at: DateTime<Utc>,
    pub badge_level: BadgeLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    pub reason: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_with_missing_lists() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": 5,
            "firstName": "Katherine",
            "lastName": "Johnson",
            "email": "kj@example.com",
            "linkedInUrl": "https://linkedin.com/in/kj"
        }))
        .unwrap();
        assert!(profile.skills.is_empty());
        assert_eq!(profile.linked_in_url.as_deref(), Some("https://linkedin.com/in/kj"));
    }

    #[test]
    fn test_update_request_skips_unset_fields() {
        let request = UpdateUserProfileRequest {
            bio: Some("Orbital mechanics".to_string()),
            skills: Some(vec!["Fortran".to_string()]),
            ..Default::default()
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({ "bio": "Orbital mechanics", "skills": ["Fortran"] }));
    }

    #[test]
    fn test_achievement_badge_level() {
        let achievement: UserAchievement = serde_json::from_value(json!({
            "id": 1,
            "title": "First steps",
            "description": "Completed a course",
            "unlockedAt": "2024-05-01T12:00:00Z",
            "badgeLevel": "Gold"
        }))
        .unwrap();
        assert_eq!(achievement.badge_level, BadgeLevel::Gold);
        assert!(achievement.icon_url.is_none());
    }
}
