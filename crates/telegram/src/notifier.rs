use async_trait::async_trait;
use teloxide::prelude::*;

use common::{Error, Notifier, Result};

/// Sends alerts through one long-lived bot instance.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, target: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(target), text)
            .await
            .map(|_| ())
            .map_err(|e| Error::Delivery {
                target,
                reason: e.to_string(),
            })
    }
}
