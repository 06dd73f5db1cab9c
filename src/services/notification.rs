//! Notification service implementation
//!
//! Formats study group emails from templates and delivers them through a
//! Resend-compatible transactional email API. Delivery is off by default;
//! while disabled every notification short-circuits with a fixed message.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::{CampusConfig, EmailConfig};
use crate::models::study_group::StudyGroup;
use crate::utils::errors::{EmailError, EmailResult, Result, StudyGroupsError};
use crate::utils::helpers::{escape_html, maps_link, pluralize};
use crate::utils::logging::log_api_error;
use crate::utils::timezone::{format_date, format_time};

/// Reported by every notification while email delivery is disabled
pub const EMAIL_DISABLED_MESSAGE: &str = "Email notifications disabled - requires domain verification";

pub const JOIN_CONFIRMATION: &str = "join_confirmation";
pub const ORGANIZER_JOINED: &str = "organizer_joined";
pub const PARTICIPANT_LEFT: &str = "participant_left";
pub const ORGANIZER_LEFT: &str = "organizer_left";

/// Email template with `{placeholder}` parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub key: String,
    pub subject: String,
    pub heading: String,
    pub body: String,
}

/// Outgoing message in the shape the email API expects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// Values for a template: HTML-escaped for the body, plain for the subject line
#[derive(Debug, Clone, Default)]
struct TemplateParameters {
    html: HashMap<String, String>,
    text: HashMap<String, String>,
}

impl TemplateParameters {
    /// User-supplied text, escaped wherever it lands in HTML
    fn insert_text(&mut self, key: &str, value: &str) {
        self.html.insert(key.to_string(), escape_html(value));
        self.text.insert(key.to_string(), value.to_string());
    }

    /// Markup built from already-escaped values; never used in subjects
    fn insert_html(&mut self, key: &str, value: String) {
        self.html.insert(key.to_string(), value);
    }
}

/// Notification statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_by_template: HashMap<String, u64>,
}

/// Who is joining or leaving
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantNotice {
    pub name: String,
    pub email: String,
}

/// Result of a notification request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NotificationOutcome {
    Disabled {
        success: bool,
        message: String,
    },
    Sent {
        success: bool,
        #[serde(rename = "emailId")]
        email_id: String,
    },
    Pair {
        success: bool,
        #[serde(rename = "participantEmailSent")]
        participant_email_sent: bool,
        #[serde(rename = "organizerEmailSent")]
        organizer_email_sent: bool,
    },
}

impl NotificationOutcome {
    pub fn disabled() -> Self {
        NotificationOutcome::Disabled {
            success: true,
            message: EMAIL_DISABLED_MESSAGE.to_string(),
        }
    }
}

/// Notification service for study group emails
#[derive(Clone)]
pub struct NotificationService {
    client: Client,
    config: EmailConfig,
    campus: CampusConfig,
    templates: Arc<HashMap<String, EmailTemplate>>,
    stats: Arc<Mutex<NotificationStats>>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("enabled", &self.config.enabled)
            .field("api_url", &self.config.api_url)
            .finish()
    }
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(config: EmailConfig, campus: CampusConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(StudyGroupsError::Http)?;

        Ok(Self {
            client,
            config,
            campus,
            templates: Arc::new(Self::load_default_templates()),
            stats: Arc::new(Mutex::new(NotificationStats::default())),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Confirmation sent to a student who just joined
    pub async fn send_join_confirmation(&self, group: &StudyGroup, participant: &ParticipantNotice) -> Result<NotificationOutcome> {
        if !self.is_enabled() {
            return Ok(NotificationOutcome::disabled());
        }

        let message = self.join_confirmation_email(group, participant)?;
        let email_id = self.deliver(JOIN_CONFIRMATION, message).await?;
        Ok(NotificationOutcome::Sent { success: true, email_id })
    }

    /// Tell the organizer someone joined, including the remaining capacity
    pub async fn send_organizer_notification(
        &self,
        group: &StudyGroup,
        participant_name: &str,
        participant_count: i64,
    ) -> Result<NotificationOutcome> {
        if !self.is_enabled() {
            return Ok(NotificationOutcome::disabled());
        }

        let message = self.organizer_joined_email(group, participant_name, participant_count)?;
        let email_id = self.deliver(ORGANIZER_JOINED, message).await?;
        Ok(NotificationOutcome::Sent { success: true, email_id })
    }

    /// Both join emails; a failed delivery is reported rather than raised
    pub async fn on_participant_joined(
        &self,
        group: &StudyGroup,
        participant: &ParticipantNotice,
        participant_count: i64,
    ) -> Result<NotificationOutcome> {
        if !self.is_enabled() {
            return Ok(NotificationOutcome::disabled());
        }

        let confirmation = self.join_confirmation_email(group, participant)?;
        let organizer = self.organizer_joined_email(group, &participant.name, participant_count)?;

        Ok(NotificationOutcome::Pair {
            success: true,
            participant_email_sent: self.deliver(JOIN_CONFIRMATION, confirmation).await.is_ok(),
            organizer_email_sent: self.deliver(ORGANIZER_JOINED, organizer).await.is_ok(),
        })
    }

    /// Confirmation to the student who left plus a notice to the organizer
    pub async fn on_participant_left(&self, group: &StudyGroup, participant: &ParticipantNotice) -> Result<NotificationOutcome> {
        if !self.is_enabled() {
            return Ok(NotificationOutcome::disabled());
        }

        let mut parameters = self.group_parameters(group);
        parameters.insert_text("participant_name", &participant.name);

        let to_participant = self.render(PARTICIPANT_LEFT, &parameters, &participant.email)?;
        let to_organizer = self.render(ORGANIZER_LEFT, &parameters, &group.organizer_email)?;

        Ok(NotificationOutcome::Pair {
            success: true,
            participant_email_sent: self.deliver(PARTICIPANT_LEFT, to_participant).await.is_ok(),
            organizer_email_sent: self.deliver(ORGANIZER_LEFT, to_organizer).await.is_ok(),
        })
    }

    fn join_confirmation_email(&self, group: &StudyGroup, participant: &ParticipantNotice) -> Result<EmailMessage> {
        let mut parameters = self.group_parameters(group);
        parameters.insert_text("participant_name", &participant.name);
        self.render(JOIN_CONFIRMATION, &parameters, &participant.email)
    }

    fn organizer_joined_email(&self, group: &StudyGroup, participant_name: &str, participant_count: i64) -> Result<EmailMessage> {
        let mut parameters = self.group_parameters(group);
        parameters.insert_text("participant_name", participant_name);
        parameters.insert_text("capacity_info", &capacity_info(group.student_limit, participant_count));
        self.render(ORGANIZER_JOINED, &parameters, &group.organizer_email)
    }

    /// Parameters shared by every study group email
    fn group_parameters(&self, group: &StudyGroup) -> TemplateParameters {
        let mut parameters = TemplateParameters::default();
        parameters.insert_text("subject", &group.subject);
        parameters.insert_text("location", &group.location);
        parameters.insert_text("maps_link", &maps_link(&group.location));
        parameters.insert_text("date", &format_date(group.start_time));
        parameters.insert_text("start_time", &format_time(group.start_time));
        parameters.insert_text("end_time", &format_time(group.end_time));
        parameters.insert_html(
            "professor_line",
            group
                .professor_name
                .as_deref()
                .map(|name| format!("<p><strong>Professor:</strong> {}</p>", escape_html(name)))
                .unwrap_or_default(),
        );
        parameters.insert_html(
            "organizer_line",
            group
                .organizer_name
                .as_deref()
                .map(|name| format!("<p><strong>Organized by:</strong> {}</p>", escape_html(name)))
                .unwrap_or_default(),
        );
        parameters.insert_html(
            "organizer_greeting",
            group
                .organizer_name
                .as_deref()
                .map(|name| format!(" {}", escape_html(name)))
                .unwrap_or_default(),
        );
        parameters.insert_text("app_name", &self.campus.app_name);
        parameters.insert_text("campus_name", &self.campus.name);
        parameters
    }

    fn render(&self, template_key: &str, parameters: &TemplateParameters, to: &str) -> Result<EmailMessage> {
        let template = self.templates.get(template_key).ok_or_else(|| {
            StudyGroupsError::Config(format!("Email template not found: {}", template_key))
        })?;

        let html_values = &parameters.html;
        let body = fill(&template.body, html_values);
        let heading = fill(&template.heading, html_values);
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background: #003366; color: white; padding: 20px; text-align: center;">
    <h1 style="margin: 0;">{heading}</h1>
  </div>
  <div style="padding: 20px; background: #f9f9f9;">
{body}
    <p>Best,<br>{app_name}</p>
  </div>
  <div style="background: #eee; padding: 10px; text-align: center; font-size: 12px; color: #666;">
    {campus_name} Study Groups
  </div>
</div>"#,
            heading = heading,
            body = body,
            app_name = html_values.get("app_name").map(String::as_str).unwrap_or_default(),
            campus_name = html_values.get("campus_name").map(String::as_str).unwrap_or_default(),
        );

        Ok(EmailMessage {
            from: self.config.from_address.clone(),
            to: vec![to.to_string()],
            subject: fill(&template.subject, &parameters.text),
            html,
        })
    }

    /// Post a message to the email API, returning its message id
    async fn deliver(&self, template_key: &str, message: EmailMessage) -> EmailResult<String> {
        debug!(template = template_key, to = ?message.to, "Sending email");

        match self.post_email(&message).await {
            Ok(id) => {
                self.update_stats_success(template_key);
                info!(template = template_key, email_id = %id, "Email sent successfully");
                Ok(id)
            }
            Err(e) => {
                self.update_stats_failure();
                error!(template = template_key, error = %e, "Failed to send email");
                log_api_error("email", &e.to_string(), Some(template_key));
                Err(e)
            }
        }
    }

    async fn post_email(&self, message: &EmailMessage) -> EmailResult<String> {
        let url = format!("{}/emails", self.config.api_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| EmailError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status, body });
        }

        let sent: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| EmailError::InvalidResponse(e.to_string()))?;

        Ok(sent.id)
    }

    fn update_stats_success(&self, template_key: &str) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_sent += 1;
            *stats.sent_by_template.entry(template_key.to_string()).or_insert(0) += 1;
        }
    }

    fn update_stats_failure(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_failed += 1;
        }
    }

    /// Get notification statistics
    pub fn get_stats(&self) -> NotificationStats {
        self.stats.lock().map(|stats| stats.clone()).unwrap_or_default()
    }

    fn load_default_templates() -> HashMap<String, EmailTemplate> {
        let details = r#"    <div style="background: white; border-radius: 8px; padding: 20px; margin: 20px 0; border-left: 4px solid #003366;">
      <h2 style="margin-top: 0; color: #003366;">{subject}</h2>
      {professor_line}
      <p><strong>Date:</strong> {date}</p>
      <p><strong>Time:</strong> {start_time} – {end_time}</p>
      <p><strong>Location:</strong> {location}</p>"#;

        let templates = [
            EmailTemplate {
                key: JOIN_CONFIRMATION.to_string(),
                subject: "You joined: {subject} Study Group".to_string(),
                heading: "You're In!".to_string(),
                body: format!(
                    "    <p>Hi {{participant_name}},</p>\n    <p>You've successfully joined a study group!</p>\n{}\n      <p><strong>Map:</strong> <a href=\"{{maps_link}}\" style=\"color: #003366;\">Open in Google Maps</a></p>\n      {{organizer_line}}\n    </div>\n    <p>Good luck with your studying!</p>",
                    details
                ),
            },
            EmailTemplate {
                key: ORGANIZER_JOINED.to_string(),
                subject: "{participant_name} joined your {subject} study group".to_string(),
                heading: "New Student Joined!".to_string(),
                body: format!(
                    "    <p>Hi{{organizer_greeting}},</p>\n    <p><strong>{{participant_name}}</strong> just joined your study group!</p>\n{}\n      <p><strong>Status:</strong> {{capacity_info}}</p>\n    </div>\n    <p>You can manage your study groups from the dashboard.</p>",
                    details
                ),
            },
            EmailTemplate {
                key: PARTICIPANT_LEFT.to_string(),
                subject: "You left: {subject} Study Group".to_string(),
                heading: "You've Left the Group".to_string(),
                body: format!(
                    "    <p>Hi {{participant_name}},</p>\n    <p>You have successfully left the following study group:</p>\n{}\n    </div>\n    <p>If you change your mind, you can always join again from the website.</p>",
                    details
                ),
            },
            EmailTemplate {
                key: ORGANIZER_LEFT.to_string(),
                subject: "{participant_name} left your {subject} study group".to_string(),
                heading: "Student Left Your Group".to_string(),
                body: format!(
                    "    <p>Hi{{organizer_greeting}},</p>\n    <p><strong>{{participant_name}}</strong> has left your study group.</p>\n{}\n    </div>\n    <p>You can view your study groups from the dashboard.</p>",
                    details
                ),
            },
        ];

        templates
            .into_iter()
            .map(|template| (template.key.clone(), template))
            .collect()
    }
}

/// "3 students joined (7 spots remaining)"
pub fn capacity_info(student_limit: Option<i32>, participant_count: i64) -> String {
    let mut info = format!("{} joined", pluralize(participant_count, "student"));
    if let Some(limit) = student_limit {
        info.push_str(&format!(" ({} spots remaining)", i64::from(limit) - participant_count));
    }
    info
}

/// Substitute `{key}` placeholders in a single left-to-right pass.
///
/// Inserted values are never scanned again; unknown keys stay as written.
fn fill(template: &str, parameters: &HashMap<String, String>) -> String {
    let mut formatted = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        formatted.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) => match parameters.get(&after[..close]) {
                Some(value) => {
                    formatted.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    formatted.push('{');
                    rest = after;
                }
            },
            None => {
                formatted.push_str(&rest[open..]);
                rest = "";
            }
        }
    }

    formatted.push_str(rest);
    formatted
}
