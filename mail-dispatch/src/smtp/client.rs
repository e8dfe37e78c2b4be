//! SMTP client for sending outgoing mail
//!
//! Connects to a relay on the submission port, upgrades with STARTTLS and
//! authenticates before the first message is sent. The session is reused
//! for every recipient of a run.

use crate::mime::ComposedMessage;
use crate::smtp::transport::{Transport, TransportError};
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};

/// Timeout applied to every SMTP command
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP relay client
///
/// # Examples
/// ```no_run
/// use mail_dispatch::smtp::{SmtpMailer, Transport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut mailer = SmtpMailer::new("smtp.example.com", 587, "user", "secret");
/// mailer.connect().await?;
/// mailer.close().await;
/// # Ok(())
/// # }
/// ```
pub struct SmtpMailer {
    server: String,
    port: u16,
    credentials: Credentials,
    inner: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            credentials: Credentials::new(username.into(), password.into()),
            inner: None,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }
}

#[async_trait]
impl Transport for SmtpMailer {
    async fn connect(&mut self) -> Result<(), TransportError> {
        info!("Connecting to SMTP server {}", self.server_addr());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.server)
            .map_err(|e| TransportError::Connect(format!("{}: {}", self.server_addr(), e)))?
            .port(self.port)
            .credentials(self.credentials.clone())
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        // Opens the session, upgrades it and authenticates.
        match transport.test_connection().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(TransportError::Connect(format!(
                    "{}: server did not accept the session",
                    self.server_addr()
                )))
            }
            Err(e) => {
                return Err(TransportError::Connect(format!(
                    "{}: {}",
                    self.server_addr(),
                    e
                )))
            }
        }

        debug!("SMTP session established with {}", self.server_addr());
        self.inner = Some(transport);
        Ok(())
    }

    async fn send(&mut self, message: &ComposedMessage) -> Result<(), TransportError> {
        let transport = self.inner.as_ref().ok_or(TransportError::NotConnected)?;
        let response = transport
            .send(message.message().clone())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        debug!("SMTP accepted {}: {:?}", message.to_address(), response.code());
        Ok(())
    }

    async fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("Closed SMTP session with {}", self.server_addr());
        }
    }
}
