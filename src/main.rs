use std::sync::Arc;

use anyhow::{Error, Result};
use comment_notifier::{
    clients::{rbmq::RabbitMqConnectionFactory, smtp::SmtpEmailSender, vault::VaultClient},
    config::{Config, VaultConfig},
    consumer::MessageConsumer,
    dispatcher::NotificationDispatcher,
    models::notification::CommentNotification,
    utils::init_tracing,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    info!("Starting comment notifier");

    let vault_config = VaultConfig::load()?;
    let secrets = VaultClient::new(&vault_config)?.load_secrets().await?;

    let config = Config::from_env_with_secrets(&secrets)?;

    let sender = SmtpEmailSender::new(&config.smtp_config())?;
    let dispatcher = NotificationDispatcher::new(Arc::new(sender));

    let consumer = MessageConsumer::new(config.consumer_config(), RabbitMqConnectionFactory);

    let cancel = CancellationToken::new();
    tokio::spawn(watch_shutdown_signal(cancel.clone()));

    let handler = move |notification: CommentNotification| {
        let dispatcher = dispatcher.clone();
        async move {
            match dispatcher.dispatch(&notification).await {
                Ok(()) => info!(author = %notification.author_name, "Notification sent"),
                Err(e) => error!(error = %e, "Failed to process notification"),
            }
        }
    };

    consumer.run(handler, cancel).await?;

    Ok(())
}

async fn watch_shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    cancel.cancel();
}
