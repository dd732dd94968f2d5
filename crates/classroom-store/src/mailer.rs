//! `Mailer` (§6) — outbound mail transport is named out of scope by §1;
//! this logs the send so `send_email` events still have an observable
//! effect without pulling in an SMTP/API client.

use async_trait::async_trait;
use tracing::info;

use classroom_core::collaborators::{Mail, Mailer};
use classroom_core::Result;

#[derive(Debug, Default)]
pub struct LoggingMailer;

impl LoggingMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send(&self, mail: Mail) -> Result<()> {
        info!(to = %mail.to, subject = %mail.subject, "mail dispatched");
        Ok(())
    }
}
