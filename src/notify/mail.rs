//! Mail delivery through an external `mail`-compatible command.
//!
//! Invoked as `<program> -s <subject> <recipient>...` with the body on stdin.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::NotifyConfig;
use crate::notify::{Notifier, NotifyError, TransitionEvent};

#[derive(Debug, Clone)]
pub struct MailNotifier {
    program: String,
    recipients: Vec<String>,
    timeout: Duration,
    pretend: bool,
}

impl MailNotifier {
    pub fn new(program: impl Into<String>, recipients: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            recipients,
            timeout,
            pretend: false,
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(
            config.mail_program.clone(),
            config.recipients.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Log messages instead of sending them.
    pub fn pretend(mut self, pretend: bool) -> Self {
        self.pretend = pretend;
        self
    }

    /// Deliver one message, waiting for the mail command to finish.
    pub async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mut child = Command::new(&self.program)
            .arg("-s")
            .arg(subject)
            .args(&self.recipients)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(NotifyError::Spawn)?;

        let stdin = child.stdin.take();
        let delivery = async {
            if let Some(mut stdin) = stdin {
                stdin.write_all(body.as_bytes()).await.map_err(NotifyError::Body)?;
                // Dropping stdin closes it so the command sees EOF
            }
            let status = child.wait().await.map_err(NotifyError::Spawn)?;
            if status.success() {
                Ok(())
            } else {
                Err(NotifyError::Exit(status))
            }
        };

        match tokio::time::timeout(self.timeout, delivery).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::TimedOut(self.timeout)),
        }
    }
}

impl Notifier for MailNotifier {
    fn notify(&self, event: &TransitionEvent) {
        let subject = event.subject();

        if self.pretend {
            tracing::info!(recipients = ?self.recipients, %subject, "Pretend: would send notification");
            return;
        }

        let mailer = self.clone();
        let body = event.body();
        tokio::spawn(async move {
            match mailer.send(&subject, &body).await {
                Ok(()) => tracing::debug!(recipients = ?mailer.recipients, %subject, "Notification sent"),
                Err(e) => tracing::warn!(error = %e, %subject, "Notification delivery failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `sh -s <subject> <recipient>` runs stdin as a script with the subject
    // and recipients as positional parameters, standing in for `mail`.
    #[tokio::test]
    async fn send_passes_subject_and_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mail.txt");
        let mailer = MailNotifier::new("/bin/sh", vec!["ops@example.com".into()], Duration::from_secs(5));

        let body = format!("printf '%s %s' \"$1\" \"$2\" > '{}'", out.display());
        mailer.send("failover", &body).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "failover ops@example.com");
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let mailer = MailNotifier::new("/bin/sh", vec![], Duration::from_secs(5));
        assert!(matches!(
            mailer.send("subject", "exit 3").await,
            Err(NotifyError::Exit(_))
        ));
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let mailer = MailNotifier::new("/nonexistent/mail", vec!["ops@example.com".into()], Duration::from_secs(1));
        assert!(matches!(
            mailer.send("s", "b").await,
            Err(NotifyError::Spawn(_))
        ));
    }

    // The command stops reading stdin, so writing the body blocks once the
    // pipe is full; the deadline must still fire.
    #[tokio::test]
    async fn stalled_body_write_times_out() {
        let mailer = MailNotifier::new("/bin/sh", vec![], Duration::from_millis(300));
        let body = format!("exec sleep 30\n{}\n", "#".repeat(1 << 20));

        let started = std::time::Instant::now();
        let result = mailer.send("subject", &body).await;

        assert!(matches!(result, Err(NotifyError::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
