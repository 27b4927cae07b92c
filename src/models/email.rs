use crate::models::notification::CommentNotification;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

impl From<&CommentNotification> for EmailContent {
    fn from(notification: &CommentNotification) -> Self {
        Self {
            subject: format!("Novo comentário de {}", notification.author_name),
            body: format!(
                "Mensagem: {}\nPúblico: {}",
                notification.message, notification.is_public
            ),
        }
    }
}
