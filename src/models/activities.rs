use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::common::non_blank;

text_enum! {
    pub enum ActivityStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

text_enum! {
    pub enum AttachmentKind {
        Image => "image",
        Pdf => "pdf",
        Document => "document",
        Video => "video",
        Other => "other",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct Attachment {
    #[validate(url(message = "Attachment url must be a valid URL"))]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SocialLink {
    #[validate(length(min = 1, max = 40, message = "Platform is required"))]
    pub platform: String,
    #[validate(url(message = "Social link must be a valid URL"))]
    pub url: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub student_id: Uuid,
    pub institute_id: Uuid,
    pub activity_type_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub details: Json<Value>,
    pub is_public: bool,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub attachments: Json<Vec<Attachment>>,
    pub social_links: Json<Vec<SocialLink>>,
    pub status: ActivityStatus,
    pub approval_remarks: Option<String>,
    pub credits_awarded: Option<i32>,
    pub rejection_reason: Option<String>,
    pub credits_earned: Option<i32>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ApprovedDetails {
    pub remarks: Option<String>,
    pub credits_awarded: Option<i32>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RejectedDetails {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Approval {
    pub state: ActivityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<ApprovedDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<RejectedDetails>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub institute_id: Uuid,
    pub activity_type_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub details: Value,
    pub is_public: bool,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub attachments: Vec<Attachment>,
    pub social_links: Vec<SocialLink>,
    pub status: ActivityStatus,
    pub approval: Approval,
    pub credits_earned: Option<i32>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        let approval = Approval {
            state: activity.status,
            approved: (activity.status == ActivityStatus::Approved).then(|| ApprovedDetails {
                remarks: activity.approval_remarks.clone(),
                credits_awarded: activity.credits_awarded,
            }),
            rejected: (activity.status == ActivityStatus::Rejected).then(|| RejectedDetails {
                reason: activity.rejection_reason.clone(),
            }),
        };

        Self {
            id: activity.id,
            student_id: activity.student_id,
            institute_id: activity.institute_id,
            activity_type_id: activity.activity_type_id,
            title: activity.title,
            description: activity.description,
            skills: activity.skills,
            details: activity.details.0,
            is_public: activity.is_public,
            date_start: activity.date_start,
            date_end: activity.date_end,
            attachments: activity.attachments.0,
            social_links: activity.social_links.0,
            status: activity.status,
            approval,
            credits_earned: activity.credits_earned,
            reviewed_by: activity.reviewed_by,
            reviewed_at: activity.reviewed_at,
            created_at: activity.created_at,
            updated_at: activity.updated_at,
        }
    }
}

#[allow(clippy::ptr_arg)]
fn validate_skills(skills: &Vec<String>) -> Result<(), ValidationError> {
    if skills.len() > 30 || skills.iter().any(|s| s.trim().is_empty() || s.len() > 60) {
        return Err(ValidationError::new(
            "skills must be at most 30 non-blank entries of up to 60 characters",
        ));
    }
    Ok(())
}

fn default_details() -> Value {
    Value::Object(Default::default())
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateActivityRequest {
    pub activity_type_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Title is required"), custom = "non_blank")]
    pub title: String,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_skills")]
    pub skills: Vec<String>,
    #[serde(default = "default_details")]
    pub details: Value,
    #[serde(default = "default_public")]
    pub is_public: bool,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 attachments are allowed"))]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    #[validate(length(max = 10, message = "At most 10 social links are allowed"))]
    pub social_links: Vec<SocialLink>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateActivityRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"), custom = "non_blank")]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    #[validate(custom = "validate_skills")]
    pub skills: Option<Vec<String>>,
    pub details: Option<Value>,
    pub is_public: Option<bool>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    #[validate(length(max = 10, message = "At most 10 attachments are allowed"))]
    pub attachments: Option<Vec<Attachment>>,
    #[validate(length(max = 10, message = "At most 10 social links are allowed"))]
    pub social_links: Option<Vec<SocialLink>>,
}

/// Nested `Vec` validation is not derived, so links and attachments are checked here.
pub fn validate_media(
    attachments: &[Attachment],
    social_links: &[SocialLink],
) -> Result<(), validator::ValidationErrors> {
    for attachment in attachments {
        attachment.validate()?;
    }
    for link in social_links {
        link.validate()?;
    }
    Ok(())
}

pub fn validate_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), String> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err("date_end cannot be earlier than date_start".into())
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveActivityRequest {
    pub credits_awarded: Option<i32>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectActivityRequest {
    pub reason: Option<String>,
}

impl RejectActivityRequest {
    pub fn reason(&self) -> Result<String, String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .ok_or_else(|| "A rejection reason is required".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub status: Option<ActivityStatus>,
    pub activity_type_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Serialize, sqlx::FromRow, PartialEq)]
pub struct ActivityStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
    pub total_credits: i64,
}

/// Outcome of a review, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewDecision {
    Approve {
        credits_awarded: Option<i32>,
        credits_earned: i32,
        remarks: Option<String>,
    },
    Reject {
        reason: String,
    },
}

impl ReviewDecision {
    pub fn status(&self) -> ActivityStatus {
        match self {
            ReviewDecision::Approve { .. } => ActivityStatus::Approved,
            ReviewDecision::Reject { .. } => ActivityStatus::Rejected,
        }
    }
}

/// `min(requested, max_credits)`, where an omitted request defaults to `min_credits`.
pub fn earned_credits(
    credits_awarded: Option<i32>,
    min_credits: i32,
    max_credits: i32,
) -> Result<i32, String> {
    let requested = credits_awarded.unwrap_or(min_credits);
    if requested < 0 {
        return Err("credits_awarded cannot be negative".into());
    }
    Ok(requested.min(max_credits))
}

/// Reviews only ever leave PENDING.
pub fn ensure_pending(status: ActivityStatus, action: &str) -> Result<(), String> {
    match status {
        ActivityStatus::Pending => Ok(()),
        other => Err(format!(
            "Cannot {action} an activity that is already {other}"
        )),
    }
}

/// Who is looking at an activity.
#[derive(Debug, Clone, Copy)]
pub enum Viewer {
    Student { student_id: Uuid },
    Reviewer { institute_id: Uuid },
}

pub fn check_visibility(activity: &Activity, viewer: Viewer) -> Result<(), &'static str> {
    match viewer {
        Viewer::Student { student_id } if activity.student_id == student_id => Ok(()),
        Viewer::Student { .. } => Err("You can only view your own activities"),
        Viewer::Reviewer { institute_id } if activity.institute_id != institute_id => {
            Err("This activity belongs to another institute")
        }
        Viewer::Reviewer { .. } if !activity.is_public => Err("This activity is private"),
        Viewer::Reviewer { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok};
    use quickcheck_macros::quickcheck;

    fn activity(student_id: Uuid, institute_id: Uuid, is_public: bool) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            student_id,
            institute_id,
            activity_type_id: Uuid::new_v4(),
            title: "Hackathon".into(),
            description: None,
            skills: vec![],
            details: Json(default_details()),
            is_public,
            date_start: None,
            date_end: None,
            attachments: Json(vec![]),
            social_links: Json(vec![]),
            status: ActivityStatus::Pending,
            approval_remarks: None,
            credits_awarded: None,
            rejection_reason: None,
            credits_earned: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn credits_are_capped_at_the_type_maximum() {
        assert_eq!(earned_credits(Some(100), 1, 10), Ok(10));
        assert_eq!(earned_credits(Some(3), 1, 10), Ok(3));
        assert_eq!(earned_credits(None, 4, 10), Ok(4));
        assert_err!(earned_credits(Some(-1), 0, 10));
    }

    #[quickcheck]
    fn earned_credits_never_exceed_max(awarded: Option<u16>, min: u8, extra: u8) -> bool {
        let min = i32::from(min);
        let max = min + i32::from(extra);
        let earned = earned_credits(awarded.map(i32::from), min, max).unwrap();
        earned <= max && earned >= 0
    }

    #[test]
    fn only_pending_activities_can_be_reviewed() {
        assert_ok!(ensure_pending(ActivityStatus::Pending, "approve"));
        assert_eq!(
            ensure_pending(ActivityStatus::Approved, "reject"),
            Err("Cannot reject an activity that is already APPROVED".to_string())
        );
    }

    #[test]
    fn rejection_needs_a_reason() {
        assert_err!(RejectActivityRequest::default().reason());
        assert_err!(RejectActivityRequest {
            reason: Some("   ".into())
        }
        .reason());
        assert_eq!(
            RejectActivityRequest {
                reason: Some(" Insufficient evidence ".into())
            }
            .reason(),
            Ok("Insufficient evidence".to_string())
        );
    }

    #[test]
    fn owners_see_everything_and_other_students_nothing() {
        let owner = Uuid::new_v4();
        let institute = Uuid::new_v4();
        let private = activity(owner, institute, false);

        assert_ok!(check_visibility(&private, Viewer::Student { student_id: owner }));
        assert_err!(check_visibility(
            &private,
            Viewer::Student {
                student_id: Uuid::new_v4()
            }
        ));
    }

    #[test]
    fn reviewers_see_public_activities_of_their_institute() {
        let institute = Uuid::new_v4();
        let public = activity(Uuid::new_v4(), institute, true);
        let private = activity(Uuid::new_v4(), institute, false);

        assert_ok!(check_visibility(&public, Viewer::Reviewer { institute_id: institute }));
        assert_err!(check_visibility(&private, Viewer::Reviewer { institute_id: institute }));
        assert_err!(check_visibility(
            &public,
            Viewer::Reviewer {
                institute_id: Uuid::new_v4()
            }
        ));
    }

    #[test]
    fn approval_subdocument_tracks_state() {
        let mut approved = activity(Uuid::new_v4(), Uuid::new_v4(), true);
        approved.status = ActivityStatus::Approved;
        approved.credits_awarded = Some(3);
        approved.approval_remarks = Some("Well done".into());

        let response = ActivityResponse::from(approved);
        assert_eq!(
            response.approval.approved,
            Some(ApprovedDetails {
                remarks: Some("Well done".into()),
                credits_awarded: Some(3),
            })
        );
        assert!(response.approval.rejected.is_none());
    }

    #[test]
    fn blank_titles_fail_validation() {
        let request: CreateActivityRequest = serde_json::from_value(serde_json::json!({
            "activity_type_id": Uuid::new_v4(),
            "title": "   ",
        }))
        .unwrap();
        assert_err!(request.validate());

        let update = UpdateActivityRequest {
            title: Some("\t".into()),
            ..Default::default()
        };
        assert_err!(update.validate());
        assert_ok!(UpdateActivityRequest::default().validate());
    }

    #[test]
    fn end_date_cannot_precede_start() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 10);
        let end = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_err!(validate_dates(start, end));
        assert_ok!(validate_dates(start, start));
        assert_ok!(validate_dates(None, end));
    }
}
