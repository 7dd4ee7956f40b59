//! Outbound notifications (password-reset mail)

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// A message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: String,
    pub recipient_name: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay request failed: {0}")]
    Transport(String),

    #[error("mail relay rejected the message with status {0}")]
    Rejected(u16),
}

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of delivering them.
///
/// The body (which holds the reset link) is only logged at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "Notification queued (log delivery)"
        );
        debug!(body = %notification.html_body, "Notification body");
        Ok(())
    }
}

/// Posts notifications as JSON to an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&notification)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        info!(recipient = %notification.recipient, "Notification delivered to mail relay");
        Ok(())
    }
}

/// HTML body of the password-reset mail.
pub fn render_reset_email(
    app_name: &str,
    recipient_name: &str,
    reset_url: &str,
    expires_at: DateTime<Utc>,
) -> String {
    let expires = expires_at.format("%Y-%m-%d %H:%M:%S UTC");
    let year = Utc::now().year();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>Password reset</title>
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
    .header {{ background: #4f46e5; color: white; padding: 20px; text-align: center; }}
    .content {{ padding: 30px; background: #f9f9f9; }}
    .button {{ display: inline-block; padding: 12px 24px; background: #4f46e5; color: white; text-decoration: none; border-radius: 5px; margin: 20px 0; }}
    .link {{ word-break: break-all; background: #e5e7eb; padding: 10px; border-radius: 5px; }}
    .footer {{ text-align: center; font-size: 12px; color: #666; margin-top: 30px; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header"><h1>Password reset</h1></div>
    <div class="content">
      <p>Hello <strong>{name}</strong>,</p>
      <p>We received a request to reset the password of your account.</p>
      <p style="text-align: center;"><a href="{url}" class="button">Reset password</a></p>
      <p>Or copy this link into your browser:</p>
      <p class="link">{url}</p>
      <p><strong>This link expires at {expires}.</strong></p>
      <p>If you did not request a reset you can ignore this message; your password will not change.</p>
    </div>
    <div class="footer"><p>&copy; {year} {app}</p></div>
  </div>
</body>
</html>"#,
        name = escape_html(recipient_name),
        url = escape_html(reset_url),
        expires = expires,
        year = year,
        app = escape_html(app_name),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::{Arc, Mutex};

    fn notification() -> Notification {
        Notification {
            recipient: "ada@example.com".into(),
            recipient_name: "Ada Lovelace".into(),
            subject: "Password reset".into(),
            html_body: "<p>hi</p>".into(),
        }
    }

    #[test]
    fn test_reset_email_contains_link_and_expiry() {
        let expires = DateTime::parse_from_rfc3339("2030-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let html = render_reset_email(
            "Teamspace",
            "Ada <script>",
            "http://localhost:3000/reset-password?token=abc&email=a%40b.c",
            expires,
        );

        assert!(html.contains("token=abc&amp;email=a%40b.c"));
        assert!(html.contains("2030-01-02 03:04:05 UTC"));
        assert!(html.contains("Ada &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.send(notification()).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_notifier_posts_json() {
        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::default();
        let sink = received.clone();
        let app = Router::new().route(
            "/mail",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    StatusCode::ACCEPTED
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let notifier = HttpNotifier::new(format!("http://{}/mail", addr));
        notifier.send(notification()).await.unwrap();

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["recipient"], "ada@example.com");
        assert_eq!(bodies[0]["subject"], "Password reset");
    }

    #[tokio::test]
    async fn test_http_notifier_reports_rejection() {
        let app = Router::new().route("/mail", post(|| async { StatusCode::BAD_GATEWAY }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let notifier = HttpNotifier::new(format!("http://{}/mail", addr));
        let result = notifier.send(notification()).await;

        assert!(matches!(result, Err(NotifyError::Rejected(502))));
    }
}
