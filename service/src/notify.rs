//! Best-effort outbound messages to the league's group chat.

use std::time::Duration;

use log::{error, info, warn};
use serde::Serialize;

use crate::config::Settings;
use crate::context::AppContext;
use crate::error::GenericError;
use crate::{purse, query};

#[rocket::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), GenericError>;
}

/// Sends `text` and logs any failure. Never fails the caller.
pub async fn broadcast(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.send(text).await {
        error!("Failed to send group message: {}", e);
    }
}

#[derive(Serialize)]
struct BotPost<'a> {
    text: &'a str,
    bot_id: &'a str,
}

pub struct GroupMeNotifier {
    http: reqwest::Client,
    base_url: String,
    bot_id: Option<String>,
}

impl GroupMeNotifier {
    pub fn new(
        base_url: impl Into<String>,
        bot_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenericError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenericError::Config(format!("Unable to build GroupMe client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bot_id,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, GenericError> {
        Self::new(
            settings.groupme_base_url.clone(),
            settings.groupme_bot_id.clone(),
            settings.notify_timeout,
        )
    }
}

#[rocket::async_trait]
impl Notifier for GroupMeNotifier {
    async fn send(&self, text: &str) -> Result<(), GenericError> {
        let Some(bot_id) = self.bot_id.as_deref() else {
            warn!("GroupMe bot id not configured, skipping message");
            return Ok(());
        };
        self.http
            .post(format!("{}/bots/post", self.base_url))
            .json(&BotPost { text, bot_id })
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| GenericError::Feed(format!("GroupMe rejected the message: {e}")))?;
        info!(
            "GroupMe message sent: {}...",
            text.chars().take(50).collect::<String>()
        );
        Ok(())
    }
}

/// Score to par as golfers write it. `None` is a disqualified entry.
pub fn format_score(score: Option<i32>) -> String {
    match score {
        None => "DQ".to_string(),
        Some(0) => "E".to_string(),
        Some(s) if s > 0 => format!("+{s}"),
        Some(s) => s.to_string(),
    }
}

pub fn format_purse(purse: Option<i64>) -> String {
    match purse {
        Some(p) if p > 0 => format!("${p}"),
        _ => "Not set".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickAction {
    Created,
    Updated,
}

impl PickAction {
    fn as_str(&self) -> &'static str {
        match self {
            PickAction::Created => "Created",
            PickAction::Updated => "Updated",
        }
    }
}

/// Golfer names per tier, `None` for an empty tier.
pub fn pick_message(
    display_name: &str,
    action: PickAction,
    entry_number: i32,
    tournament_name: &str,
    golfers: &[Option<String>; 4],
    purse: Option<i64>,
) -> String {
    let mut lines = vec![format!(
        "🏌️ {display_name} {} Entry {entry_number} for {tournament_name}",
        action.as_str()
    )];
    for (tier, golfer) in golfers.iter().enumerate() {
        lines.push(format!(
            "Tier {}: {}",
            tier + 1,
            golfer.as_deref().unwrap_or("-")
        ));
    }
    lines.push(format!("💰 Total Purse: {}", format_purse(purse)));
    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardLine {
    pub rank: i32,
    pub name: String,
    pub best_two_total: Option<i32>,
}

/// Top ten of a tournament's standings as a chat message.
pub fn leaderboard_message(
    tournament_name: &str,
    purse: Option<i64>,
    lines: &[LeaderboardLine],
) -> String {
    let mut out = vec![format!("🏌️ {tournament_name} - Top 10")];
    if let Some(p) = purse.filter(|p| *p > 0) {
        out.push(format!("💰 Purse: ${p}"));
    }
    out.push(String::new());
    out.extend(lines.iter().take(10).map(|line| {
        format!(
            "{}. {} - {}",
            line.rank,
            line.name,
            format_score(line.best_two_total)
        )
    }));
    out.join("\n")
}

/// Builds the current top ten of a tournament and sends it to the group.
pub async fn announce_leaderboard(ctx: &AppContext, tournament_id: i32) -> Result<String, GenericError> {
    let tournament = query::tournament(&ctx.db, tournament_id).await?;
    let standings = query::standings_view(&ctx.db, tournament_id).await?;
    let purse = purse::tournament_purse(&ctx.db, &tournament).await?;
    let lines = standings
        .into_iter()
        .map(|row| LeaderboardLine {
            rank: row.rank,
            name: row.display_name,
            best_two_total: row.best_two_total,
        })
        .collect::<Vec<_>>();
    let text = leaderboard_message(&tournament.name, purse, &lines);
    broadcast(ctx.notifier.as_ref(), &text).await;
    Ok(text)
}
