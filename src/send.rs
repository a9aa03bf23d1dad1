//! Templated email composition and raw RFC 2822 assembly

use minijinja::Environment;
use serde::Serialize;
use tracing::info;

use crate::client::MailClient;
use crate::error::{Result, TriageError};

/// Names of the built-in templates, in registration order.
pub const TEMPLATE_NAMES: [&str; 5] = [
    "welcome",
    "meeting",
    "thank_you",
    "auto_reply",
    "newsletter",
];

const WELCOME_TEMPLATE: &str = r#"Subject: Welcome to {{ company_name }}!

<!DOCTYPE html>
<html>
<head>
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 600px; margin: 0 auto; padding: 20px; }
    .header { background: #4CAF50; color: white; padding: 24px; text-align: center; border-radius: 8px 8px 0 0; }
    .content { padding: 24px; background: #f9f9f9; }
    .footer { text-align: center; padding: 16px; color: #888; font-size: 12px; }
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>Welcome, {{ name }}! 🎉</h1>
    </div>
    <div class="content">
      <p>Hi {{ name }},</p>
      <p>Thank you for joining <strong>{{ company_name }}</strong>!
         We're excited to have you on board.</p>
      <h3>What's Next?</h3>
      <ul>
        <li>Complete your profile</li>
        <li>Explore our features</li>
        <li>Connect with your team</li>
      </ul>
      <p>If you have any questions, reach out to our support team anytime.</p>
      <p>Best regards,<br>The {{ company_name }} Team</p>
    </div>
    <div class="footer">
      <p>&copy; {{ year }} {{ company_name }}. All rights reserved.</p>
    </div>
  </div>
</body>
</html>
"#;

const MEETING_TEMPLATE: &str = r#"Subject: Meeting Confirmed - {{ meeting_title }}

<!DOCTYPE html>
<html>
<head>
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 600px; margin: 0 auto; padding: 20px; }
    .header { background: #2196F3; color: white; padding: 20px; border-radius: 8px 8px 0 0; }
    .info-box { background: #e3f2fd; padding: 16px; margin: 16px 0; border-left: 4px solid #2196F3; }
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h2>📅 Meeting Confirmed</h2>
    </div>
    <div style="padding: 20px; background: #f9f9f9;">
      <p>Hi {{ attendee_name }},</p>
      <p>Your meeting has been confirmed!</p>
      <div class="info-box">
        <h3>{{ meeting_title }}</h3>
        <p><strong>📅 Date:</strong> {{ date }}</p>
        <p><strong>🕐 Time:</strong> {{ time }}</p>
        <p><strong>📍 Location:</strong> {{ location }}</p>
        {% if agenda %}
        <p><strong>📋 Agenda:</strong><br>{{ agenda }}</p>
        {% endif %}
      </div>
      <p>Looking forward to seeing you there!</p>
      <p>Best regards,<br>{{ organizer_name }}</p>
    </div>
  </div>
</body>
</html>
"#;

const THANK_YOU_TEMPLATE: &str = r#"Subject: Thank You, {{ name }}!

<!DOCTYPE html>
<html>
<head>
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 600px; margin: 0 auto; padding: 20px; }
    .header { background: #FF9800; color: white; padding: 24px; text-align: center; border-radius: 8px 8px 0 0; }
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h2>Thank You! 🙏</h2>
    </div>
    <div style="padding: 24px; background: #f9f9f9;">
      <p>Dear {{ name }},</p>
      <p>{{ message }}</p>
      <p>We truly appreciate your <strong>{{ reason }}</strong>.</p>
      <p>Warm regards,<br>{{ sender_name }}</p>
    </div>
  </div>
</body>
</html>
"#;

const AUTO_REPLY_TEMPLATE: &str = r#"Subject: Re: {{ original_subject }}

<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <p>Hi,</p>
  <p>Thank you for your email. This is an automated response to confirm
     that your message has been received.</p>
  {% if availability_date %}
  <p>I will be available to respond starting <strong>{{ availability_date }}</strong>.</p>
  {% else %}
  <p>I will respond as soon as possible.</p>
  {% endif %}
  {% if urgent_contact %}
  <p>For urgent matters, please contact:
     <a href="mailto:{{ urgent_contact }}">{{ urgent_contact }}</a></p>
  {% endif %}
  <p>Best regards,<br>{{ sender_name }}</p>
</body>
</html>
"#;

const NEWSLETTER_TEMPLATE: &str = r##"Subject: {{ newsletter_title }} - {{ date }}

<!DOCTYPE html>
<html>
<head>
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 700px; margin: 0 auto; }
    .header { background: #673AB7; color: white; padding: 30px; text-align: center; }
    .article { padding: 20px; border-bottom: 1px solid #eee; }
    .article h3 { color: #673AB7; margin: 0 0 8px; }
    .footer { text-align: center; padding: 20px; color: #888; font-size: 12px; }
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h1>{{ newsletter_title }}</h1>
      <p>{{ date }}</p>
    </div>
    {% for article in articles %}
    <div class="article">
      <h3>{{ article.title }}</h3>
      <p>{{ article.content }}</p>
      {% if article.link %}
      <p><a href="{{ article.link }}">Read more →</a></p>
      {% endif %}
    </div>
    {% endfor %}
    <div class="footer">
      <p>You're receiving this because you subscribed to our newsletter.</p>
      <p><a href="#">Unsubscribe</a></p>
    </div>
  </div>
</body>
</html>
"##;

/// The built-in templates, compiled into a minijinja environment.
///
/// Each template is a `Subject:` line, a blank line, then an HTML body;
/// [`parse_rendered`] splits the rendered text back apart.
pub struct TemplateSet {
    env: Environment<'static>,
}

impl TemplateSet {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();

        let sources = [
            ("welcome", WELCOME_TEMPLATE),
            ("meeting", MEETING_TEMPLATE),
            ("thank_you", THANK_YOU_TEMPLATE),
            ("auto_reply", AUTO_REPLY_TEMPLATE),
            ("newsletter", NEWSLETTER_TEMPLATE),
        ];

        for (name, source) in sources {
            env.add_template(name, source).map_err(|e| {
                TriageError::TemplateError(format!("Failed to compile template '{}': {}", name, e))
            })?;
        }

        Ok(Self { env })
    }

    /// Render a built-in template with the given context.
    ///
    /// Unknown variables render as empty strings; an unknown template
    /// name is an error listing the available templates.
    pub fn render<S: Serialize>(&self, name: &str, context: &S) -> Result<String> {
        let template = self.env.get_template(name).map_err(|_| {
            TriageError::TemplateError(format!(
                "Unknown template '{}'. Available: {}",
                name,
                TEMPLATE_NAMES.join(", ")
            ))
        })?;

        template.render(context).map_err(|e| {
            TriageError::TemplateError(format!("Failed to render template '{}': {}", name, e))
        })
    }
}

/// A rendered template split into its deliverable pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEmail {
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

const SUBJECT_PREFIX: &str = "subject:";

/// Split rendered template text into subject and body.
///
/// The first line whose trimmed form starts with a case-insensitive
/// `subject:` prefix supplies the subject; the first blank line after it
/// starts the body. Lines before the subject, and anything when no
/// subject line exists, are ignored. The body counts as HTML when it
/// starts with `<` after trimming.
pub fn parse_rendered(text: &str) -> ParsedEmail {
    let mut subject: Option<String> = None;
    let mut body_lines: Vec<&str> = Vec::new();
    let mut in_body = false;

    for line in text.trim().lines() {
        let trimmed = line.trim();
        let has_prefix = trimmed
            .get(..SUBJECT_PREFIX.len())
            .map_or(false, |p| p.eq_ignore_ascii_case(SUBJECT_PREFIX));

        if !in_body && subject.is_none() && has_prefix {
            subject = Some(trimmed[SUBJECT_PREFIX.len()..].trim().to_string());
        } else if subject.is_some() && !in_body && trimmed.is_empty() {
            in_body = true;
        } else if in_body {
            body_lines.push(line);
        }
    }

    let body = body_lines.join("\n").trim().to_string();
    let is_html = body.starts_with('<');

    ParsedEmail {
        subject: subject.unwrap_or_default(),
        body,
        is_html,
    }
}

/// Collapse CR/LF so a value cannot smuggle extra headers into the
/// message.
fn header_safe(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Assemble a raw RFC 2822 message ready for the send endpoint.
pub fn build_raw_message(
    to: &str,
    from: Option<&str>,
    subject: &str,
    body: &str,
    is_html: bool,
) -> Vec<u8> {
    let content_type = if is_html { "text/html" } else { "text/plain" };

    let mut message = String::new();
    message.push_str(&format!("To: {}\r\n", header_safe(to)));
    if let Some(from) = from {
        message.push_str(&format!("From: {}\r\n", header_safe(from)));
    }
    message.push_str(&format!("Subject: {}\r\n", header_safe(subject)));
    message.push_str(&format!("Date: {}\r\n", chrono::Utc::now().to_rfc2822()));
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str(&format!("Content-Type: {}; charset=utf-8\r\n", content_type));
    message.push_str("\r\n");
    message.push_str(body);

    message.into_bytes()
}

/// Render a template, split it, and send the result.
///
/// Returns the sent message ID.
pub async fn send_templated<S: Serialize>(
    client: &dyn MailClient,
    templates: &TemplateSet,
    to: &str,
    from: Option<&str>,
    template_name: &str,
    context: &S,
) -> Result<String> {
    let rendered = templates.render(template_name, context)?;
    let parsed = parse_rendered(&rendered);

    info!(
        "Sending '{}' template to {} (html: {})",
        template_name, to, parsed.is_html
    );

    let raw = build_raw_message(to, from, &parsed.subject, &parsed.body, parsed.is_html);
    let message_id = client.send_message(raw).await?;

    info!("Email sent to {} (message ID: {})", to, message_id);
    Ok(message_id)
}
