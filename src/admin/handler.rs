use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::dispatching::{Dispatcher, ShutdownToken};
use teloxide::{dptree, prelude::*};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::admin::commands::{self, parse_command, AdminCommand};
use crate::domain::{ChatId, UserId};
use crate::errors::RelayError;
use crate::messaging::MessagingPort;
use crate::services::RegistryHandle;

/// How often to ask a dispatcher that is still starting up to stop
const SHUTDOWN_RETRY: Duration = Duration::from_millis(100);

pub struct AdminState {
    pub registry: RegistryHandle,
    pub messenger: Arc<dyn MessagingPort>,
    pub admin: UserId,
    pub poll_interval: Duration,
}

/// Work out the reply to a chat message; `None` means stay silent
pub async fn respond(state: &AdminState, caller: UserId, text: &str) -> Option<String> {
    let is_admin = caller == state.admin;

    let Some(command) = parse_command(text) else {
        // Chatter from strangers is ignored
        return is_admin.then(|| commands::UNKNOWN.to_string());
    };

    if !is_admin && !command.is_public() {
        warn!(user_id = caller.0, "command from unauthorized user");
        return Some(commands::DENIED.to_string());
    }

    let (name, result) = match command {
        AdminCommand::Help => return Some(commands::help_text(state.poll_interval)),
        AdminCommand::Unknown(_) => return Some(commands::UNKNOWN.to_string()),
        AdminCommand::Invalid(reply) => return Some(reply),
        AdminCommand::Add { name, sort_mode } => {
            let result = state
                .registry
                .add(caller, &name, sort_mode)
                .await
                .map(|source| commands::added(&source));
            (name, result)
        }
        AdminCommand::Remove { name } => {
            let result = state
                .registry
                .remove(caller, &name)
                .await
                .map(|normalized| commands::removed(&normalized));
            (name, result)
        }
        AdminCommand::Reset { name } => {
            let result = state
                .registry
                .reset(caller, &name)
                .await
                .map(|normalized| commands::reset_done(&normalized));
            (name, result)
        }
        AdminCommand::List => {
            let result = state
                .registry
                .list(caller)
                .await
                .map(|sources| commands::format_list(&sources));
            (String::new(), result)
        }
        AdminCommand::Status => {
            let result = state
                .registry
                .status(caller)
                .await
                .map(|reports| commands::format_status(&reports));
            (String::new(), result)
        }
    };

    match result {
        Ok(reply) => Some(reply),
        Err(e) => {
            if matches!(e, RelayError::Unauthorized) {
                warn!(user_id = caller.0, "command from unauthorized user");
            } else {
                debug!(user_id = caller.0, error = %e, "admin command failed");
            }
            Some(commands::error_reply(&e, &name))
        }
    }
}

pub async fn handle_message(msg: Message, state: Arc<AdminState>) -> ResponseResult<()> {
    let (Some(text), Some(user)) = (msg.text(), msg.from()) else {
        return Ok(());
    };
    let caller = UserId(user.id.0 as i64);
    let chat_id = ChatId(msg.chat.id.0);

    if let Some(reply) = respond(&state, caller, text).await {
        if let Err(e) = state.messenger.send_text(chat_id, &reply).await {
            warn!(chat_id = chat_id.0, error = %e, "failed to answer admin command");
        }
    }

    Ok(())
}

/// Serve the admin shell until `shutdown` is cancelled
pub async fn run(bot: Bot, state: Arc<AdminState>, shutdown: CancellationToken) {
    // Commands sent while the relay was down are stale
    if let Err(e) = bot.delete_webhook().drop_pending_updates(true).await {
        warn!(error = %e, "could not drop pending updates");
    }

    let handler = Update::filter_message().endpoint(handle_message);

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .build();

    let token = dispatcher.shutdown_token();
    let stopper = tokio::spawn(stop_when_cancelled(shutdown, token));

    info!("admin shell listening");
    dispatcher.dispatch().await;
    stopper.abort();
    info!("admin shell stopped");
}

/// A running service that can be asked to stop
#[cfg_attr(test, mockall::automock)]
#[async_trait]
trait Stoppable: Send + Sync {
    /// Stop and wait for it. Returns false when refused because the
    /// service is not running yet.
    async fn try_stop(&self) -> bool;
}

#[async_trait]
impl Stoppable for ShutdownToken {
    async fn try_stop(&self) -> bool {
        match self.shutdown() {
            Ok(done) => {
                done.await;
                true
            }
            Err(_) => false,
        }
    }
}

/// Wait for `shutdown`, then keep asking until the stop is accepted.
/// Cancellation can arrive before the dispatcher is running.
async fn stop_when_cancelled<S: Stoppable>(shutdown: CancellationToken, service: S) {
    shutdown.cancelled().await;
    while !service.try_stop().await {
        debug!("admin shell not running yet, retrying shutdown");
        sleep(SHUTDOWN_RETRY).await;
    }
}
