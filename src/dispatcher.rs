use std::sync::Arc;

use tracing::debug;

use crate::{
    clients::smtp::EmailTransport,
    error::SendError,
    models::{email::EmailContent, notification::CommentNotification},
};

/// Turns comment notifications into emails. Stateless apart from the transport.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn EmailTransport>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn EmailTransport>) -> Self {
        Self { transport }
    }

    pub async fn dispatch(&self, notification: &CommentNotification) -> Result<(), SendError> {
        let content = EmailContent::from(notification);

        debug!(subject = %content.subject, "Dispatching comment notification");

        self.transport.send(&content.subject, &content.body).await
    }
}
