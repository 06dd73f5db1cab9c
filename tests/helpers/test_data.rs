//! Test data builders

use chrono::{Duration, NaiveTime, Utc};
use fake::{faker::name::en::Name, Fake};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use StudyGroups::models::study_group::GroupForm;
use StudyGroups::utils::timezone::{campus_datetime, CAMPUS_TIMEZONE};

/// A form for a group tomorrow, 14:00 to 16:00 campus time
pub fn group_form(subject: &str, student_limit: Option<i32>) -> GroupForm {
    let tomorrow = (Utc::now().with_timezone(&CAMPUS_TIMEZONE) + Duration::days(1)).date_naive();

    GroupForm {
        subject: subject.to_string(),
        description: Some("Problem set review".to_string()),
        professor_name: Some("Prof. Smith".to_string()),
        location: "Butler Library 209".to_string(),
        date: tomorrow,
        start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        student_limit,
        organizer_name: Some("Org Anizer".to_string()),
    }
}

pub fn group_form_json(subject: &str, student_limit: Option<i32>) -> Value {
    serde_json::to_value(group_form(subject, student_limit)).unwrap()
}

pub fn join_body(email: &str) -> Value {
    let name: String = Name().fake();
    json!({ "name": name, "email": email })
}

/// Insert a group that already ended, with an expiry in the past
pub async fn insert_expired_group(pool: &PgPool, organizer_email: &str) -> Uuid {
    let start = campus_datetime(
        (Utc::now() - Duration::days(3)).date_naive(),
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    )
    .unwrap();

    sqlx::query_scalar(
        r#"
        INSERT INTO study_groups (subject, location, start_time, end_time, organizer_email, expires_at)
        VALUES ('Old Subject', 'Lerner Hall', $1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(start)
    .bind(start + Duration::hours(2))
    .bind(organizer_email)
    .bind(Utc::now() - Duration::hours(1))
    .fetch_one(pool)
    .await
    .unwrap()
}
