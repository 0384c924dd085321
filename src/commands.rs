use std::fmt;
use std::sync::Arc;

use grove_core::{FamilyId, PlayerId};
use grove_engine::ErrorKind;
use grove_server::{GameService, LocalPaymentGateway, ServiceError};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Help,
    Start,
    End,
    Select(usize),
    Collect(usize),
    Buy { family: FamilyId, level: u32 },
    /// Claim by position in the active quest list.
    Claim(usize),
    Ack,
    Premium(String),
    Pay { charge: String, item: String },
    Referral(String),
    State,
}

impl SessionCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            SessionCommand::Help => "help",
            SessionCommand::Start => "start",
            SessionCommand::End => "end",
            SessionCommand::Select(_) => "select",
            SessionCommand::Collect(_) => "collect",
            SessionCommand::Buy { .. } => "buy",
            SessionCommand::Claim(_) => "claim",
            SessionCommand::Ack => "ack",
            SessionCommand::Premium(_) => "premium",
            SessionCommand::Pay { .. } => "pay",
            SessionCommand::Referral(_) => "referral",
            SessionCommand::State => "state",
        }
    }
}

/// Result of one command, ready for printing or the event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutput {
    pub ok: bool,
    pub payload: Value,
}

impl CommandOutput {
    fn error(kind: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: json!({ "kind": kind, "error": message.into() }),
        }
    }
}

fn reply<T: Serialize>(result: Result<T, ServiceError>) -> CommandOutput {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(payload) => CommandOutput { ok: true, payload },
            Err(err) => CommandOutput::error("internal", format!("unserializable outcome: {err}")),
        },
        Err(ServiceError::Engine(err)) => {
            let kind = match err.kind() {
                ErrorKind::Validation => "validation",
                ErrorKind::Outcome => "outcome",
            };
            CommandOutput::error(kind, err.to_string())
        }
        Err(err) => CommandOutput::error("service", err.to_string()),
    }
}

/// What a scripted session talks to.
pub struct SessionContext {
    pub service: Arc<GameService>,
    pub payments: Arc<LocalPaymentGateway>,
    pub token: String,
    pub player: PlayerId,
}

pub async fn execute_command(ctx: &SessionContext, cmd: SessionCommand) -> CommandOutput {
    let service = &ctx.service;
    let player = ctx.player;
    match cmd {
        SessionCommand::Help => CommandOutput {
            ok: true,
            payload: json!(help_lines()),
        },
        SessionCommand::Start => reply(service.start_session(&ctx.token, None).await),
        SessionCommand::End => reply(service.end_session(player).await),
        SessionCommand::Select(index) => reply(service.select_cell(player, index).await),
        SessionCommand::Collect(index) => reply(service.collect_creature(player, index).await),
        SessionCommand::Buy { family, level } => {
            reply(service.buy_creature(player, &family, level, None).await)
        }
        SessionCommand::Claim(position) => {
            let quest_id = match service.snapshot(player) {
                Ok(state) => match state.quests.quests.get(position) {
                    Some(quest) => quest.id.clone(),
                    None => {
                        return CommandOutput::error(
                            "validation",
                            format!("no quest at position {position}"),
                        )
                    }
                },
                Err(err) => return reply::<()>(Err(err)),
            };
            reply(service.claim_quest(player, &quest_id).await)
        }
        SessionCommand::Ack => reply(service.acknowledge_catchup(player).await),
        SessionCommand::Premium(item) => reply(service.buy_premium_item(player, &item).await),
        SessionCommand::Pay { charge, item } => {
            ctx.payments.record_charge(player, &item, &charge);
            reply(service.verify_purchase(player, &charge, &item).await)
        }
        SessionCommand::Referral(code) => reply(service.apply_referral(player, &code).await),
        SessionCommand::State => reply(service.load_state(player).await),
    }
}

pub fn parse_command(input: &str) -> Result<SessionCommand, CommandError> {
    let input = input.trim();
    let input = input.strip_prefix('/').unwrap_or(input).trim();
    if input.is_empty() {
        return Ok(SessionCommand::Help);
    }

    let mut parts = input.split_whitespace();
    let cmd = parts
        .next()
        .ok_or_else(|| CommandError::new("Missing command"))?
        .to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    let expect_args = |count: usize, usage: &str| {
        if args.len() == count {
            Ok(())
        } else {
            Err(CommandError::new(format!("Usage: {usage}")))
        }
    };

    match cmd.as_str() {
        "help" | "?" => Ok(SessionCommand::Help),
        "start" => expect_args(0, "start").map(|_| SessionCommand::Start),
        "end" => expect_args(0, "end").map(|_| SessionCommand::End),
        "select" | "tap" => {
            expect_args(1, "select <slot>")?;
            Ok(SessionCommand::Select(parse_index(args[0])?))
        }
        "collect" => {
            expect_args(1, "collect <slot>")?;
            Ok(SessionCommand::Collect(parse_index(args[0])?))
        }
        "buy" => {
            if !(1..=2).contains(&args.len()) {
                return Err(CommandError::new("Usage: buy <family> [level]"));
            }
            let family = FamilyId::parse(args[0])
                .map_err(|err| CommandError::new(format!("Invalid family: {err}")))?;
            let level = match args.get(1) {
                Some(raw) => raw
                    .parse::<u32>()
                    .ok()
                    .filter(|level| *level > 0)
                    .ok_or_else(|| CommandError::new(format!("Invalid level: {raw}")))?,
                None => 1,
            };
            Ok(SessionCommand::Buy { family, level })
        }
        "claim" => {
            expect_args(1, "claim <quest-position>")?;
            Ok(SessionCommand::Claim(parse_index(args[0])?))
        }
        "ack" => expect_args(0, "ack").map(|_| SessionCommand::Ack),
        "premium" => {
            expect_args(1, "premium <item>")?;
            Ok(SessionCommand::Premium(args[0].to_string()))
        }
        "pay" => {
            expect_args(2, "pay <charge-ref> <item>")?;
            Ok(SessionCommand::Pay {
                charge: args[0].to_string(),
                item: args[1].to_string(),
            })
        }
        "referral" => {
            expect_args(1, "referral <code>")?;
            Ok(SessionCommand::Referral(args[0].to_string()))
        }
        "state" => expect_args(0, "state").map(|_| SessionCommand::State),
        _ => Err(CommandError::new(format!("Unknown command: {cmd}. Try help"))),
    }
}

fn parse_index(s: &str) -> Result<usize, CommandError> {
    s.parse::<usize>()
        .map_err(|_| CommandError::new(format!("Invalid slot: {s}")))
}

fn help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  start | end                 open or close the session".to_string(),
        "  select <slot>               tap a grid cell".to_string(),
        "  collect <slot>              harvest finished ticks".to_string(),
        "  buy <family> [level]        buy with resources (level 1 only)".to_string(),
        "  claim <quest-position>".to_string(),
        "  ack                         dismiss the offline bonus".to_string(),
        "  premium <item>              request an invoice".to_string(),
        "  pay <charge-ref> <item>     confirm a settled charge".to_string(),
        "  referral <code>".to_string(),
        "  state".to_string(),
    ]
}
