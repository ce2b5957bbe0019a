use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, error, info};

use crate::bot::{
    chat_event::chat_event::{BotMessage, InteractionOption, Invocation, Snowflake},
    commands::{
        args::{resolve_args, resolve_options},
        commands::{Command, CommandContext},
        Resolution,
    },
    cooldown::cooldown::CooldownCheck,
    handler::handler::hydrate,
    inhibitors::inhibitors::InhibitorContext,
    state::def::{AmethystBot, AmethystError, BotResult},
};

pub type DynamicPrefix = Arc<dyn Fn(Arc<AmethystBot>, BotMessage) -> BoxFuture<'static, Vec<String>> + Send + Sync>;

/// Where command prefixes come from.
#[derive(Clone)]
pub enum Prefix {
    Static(String),
    List(Vec<String>),
    /// Evaluated for every message, e.g. per-guild prefixes.
    Dynamic(DynamicPrefix),
}

impl Prefix {
    pub fn dynamic<F>(func: F) -> Self
    where
        F: Fn(Arc<AmethystBot>, BotMessage) -> BoxFuture<'static, Vec<String>> + Send + Sync + 'static,
    {
        Prefix::Dynamic(Arc::new(func))
    }

    pub async fn candidates(&self, bot: &Arc<AmethystBot>, message: &BotMessage) -> Vec<String> {
        match self {
            Prefix::Static(prefix) => vec![prefix.clone()],
            Prefix::List(prefixes) => prefixes.clone(),
            Prefix::Dynamic(func) => func(Arc::clone(bot), message.clone()).await,
        }
    }
}

pub(crate) enum ArgInput {
    Tokens(Vec<String>),
    Options(Vec<InteractionOption>),
}

/// First candidate `content` starts with.
pub fn match_prefix<'a>(content: &str, candidates: &'a [String], case_sensitive: bool) -> Option<&'a str> {
    candidates
        .iter()
        .map(String::as_str)
        .find(|prefix| starts_with_prefix(content, prefix, case_sensitive))
}

fn starts_with_prefix(content: &str, prefix: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        return content.starts_with(prefix);
    }
    content
        .get(..prefix.len())
        .is_some_and(|head| head.to_lowercase() == prefix.to_lowercase())
}

/// `<@id>` or `<@!id>` at the start of `content`.
pub fn mention_prefix(content: &str, bot_id: Snowflake) -> Option<String> {
    [format!("<@{bot_id}>"), format!("<@!{bot_id}>")]
        .into_iter()
        .find(|mention| content.starts_with(mention.as_str()))
}

/// The prefix a message was sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedPrefix {
    /// Byte length of the prefix.
    pub len: usize,
    /// Matched through `bot_mention_as_prefix`.
    pub mention: bool,
}

pub async fn resolve_prefix(bot: &Arc<AmethystBot>, message: &BotMessage) -> Option<MatchedPrefix> {
    let candidates = bot.prefix.candidates(bot, message).await;
    if let Some(prefix) = match_prefix(&message.content, &candidates, bot.config.prefix_case_sensitive) {
        return Some(MatchedPrefix { len: prefix.len(), mention: false });
    }
    if bot.config.bot_mention_as_prefix {
        return mention_prefix(&message.content, bot.id).map(|m| MatchedPrefix { len: m.len(), mention: true });
    }
    None
}

/// Splits `content` on whitespace and strips the prefix from the first
/// token. Returns the command name and the remaining tokens, or `None` when
/// the name is empty. A mention prefix may be followed by a space.
pub fn split_command(content: &str, prefix: MatchedPrefix) -> Option<(String, Vec<String>)> {
    let mut tokens = content.split_whitespace().map(str::to_owned);
    let first = tokens.next()?;
    let mut name = first.get(prefix.len..).unwrap_or_default().to_owned();
    if name.is_empty() && prefix.mention {
        name = tokens.next()?;
    }
    if name.is_empty() {
        return None;
    }
    Some((name, tokens.collect()))
}

/// Splits on whitespace, keeping `"..."` runs together without the quotes.
/// Returns `None` on an unterminated quote.
pub fn split_quoted(input: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut token = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => token.push(c),
                    None => return None,
                }
            }
            if token.is_empty() {
                continue;
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                token.push(c);
            }
        }
        tokens.push(token);
    }

    Some(tokens)
}

/// Re-splits `tokens` honouring quotes, or keeps them as they are when the
/// quoted pass fails or finds nothing.
pub fn quoted_tokens(tokens: &[String]) -> Vec<String> {
    match split_quoted(&tokens.join(" ")) {
        Some(quoted) if !quoted.is_empty() => quoted,
        _ => tokens.to_vec(),
    }
}

pub async fn dispatch_message(bot: &Arc<AmethystBot>, message: &BotMessage) -> BotResult<()> {
    let Some(prefix) = resolve_prefix(bot, message).await else {
        debug!("No prefix in message {}", message.id);
        return Ok(());
    };
    let Some((command_name, mut args)) = split_command(&message.content, prefix) else {
        return Ok(());
    };
    let sub_name = if args.is_empty() { None } else { Some(args.remove(0)) };

    let resolution = bot.categories.read().await.resolve(&command_name, sub_name.as_deref());
    if let (Some(sub), Some(resolved)) = (sub_name, resolution.as_ref()) {
        if resolved.consumed_sub {
            debug!("{} resolved to sub-command {}", command_name, resolved.command.id());
        }
        if resolved.unique_commands {
            args.insert(0, sub);
        }
    }

    if message.author.bot {
        let ignore = resolution
            .as_ref()
            .and_then(|r| r.command.ignore_bots)
            .unwrap_or(bot.config.ignore_bots);
        if ignore {
            debug!("Ignoring bot {} in channel {}", message.author.id, message.channel_id);
            return Ok(());
        }
    }

    let invocation = Invocation::Message(message.clone());
    let Some(Resolution { command, .. }) = resolution else {
        debug!("Command not found: {}", command_name);
        bot.events.not_found(bot, &invocation, &command_name);
        return Ok(());
    };

    if command.quoted_arguments.unwrap_or(bot.config.message_quoted_arguments) {
        args = quoted_tokens(&args);
    }

    hydrate(bot, message.guild_id, message.channel_id, message.author.id, invocation.member()).await?;

    info!("{} ran {} in channel {}", message.author.name, command.id(), message.channel_id);
    bot.events.start(bot, &command, &invocation);
    execute_command(bot, &command, &invocation, ArgInput::Tokens(args)).await?;
    bot.events.end(bot, &command, &invocation);
    Ok(())
}

/// Cooldown, inhibitors, argument resolution and the command body. Vetoes
/// go to the `command_error` hook; a failing body is reported there too, or
/// returned when no hook is registered.
pub(crate) async fn execute_command(
    bot: &Arc<AmethystBot>,
    command: &Arc<Command>,
    invocation: &Invocation,
    input: ArgInput,
) -> BotResult<()> {
    if let Some(spec) = command.cooldown.as_ref().or(bot.config.default_cooldown.as_ref()) {
        if let CooldownCheck::Limited(remaining) = bot.cooldowns.check(&command.id(), invocation.author().id, spec) {
            bot.events.error(bot, &AmethystError::Cooldown { remaining }, invocation);
            return Ok(());
        }
    }

    let ctx = InhibitorContext::from(invocation);
    let veto = bot.inhibitors.read().await.evaluate(bot, command, &ctx);
    if let Some(veto) = veto {
        info!("{} was inhibited for {}: {}", command.id(), ctx.member_id, veto);
        bot.events.error(bot, &veto, invocation);
        return Ok(());
    }

    let args = match input {
        ArgInput::Tokens(tokens) => {
            resolve_args(&command.args, &tokens, invocation.attachments(), invocation.mentions())
        }
        ArgInput::Options(options) => resolve_options(&command.args, &options),
    };
    let context = CommandContext { invocation: invocation.clone(), args };

    if let Err(e) = command.execute(Arc::clone(bot), context).await {
        error!("Command {} failed: {e}", command.id());
        if !bot.events.error(bot, &AmethystError::Other, invocation) {
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn quoted_runs_become_one_token() {
        assert_eq!(quoted_tokens(&strings(&["a", "\"b", "c\"", "d"])), strings(&["a", "b c", "d"]));
    }

    #[test]
    fn unterminated_quote_falls_back_to_plain_split() {
        assert_eq!(split_quoted("a \"b c"), None);
        assert_eq!(quoted_tokens(&strings(&["a", "\"b", "c"])), strings(&["a", "\"b", "c"]));
    }

    #[test]
    fn empty_quotes_are_dropped() {
        assert_eq!(split_quoted("x \"\" y"), Some(strings(&["x", "y"])));
    }

    #[test]
    fn prefix_matching_respects_case_setting() {
        let candidates = strings(&["?", "hey "]);
        assert_eq!(match_prefix("?ping", &candidates, true), Some("?"));
        assert_eq!(match_prefix("HEY ping", &candidates, true), None);
        assert_eq!(match_prefix("HEY ping", &candidates, false), Some("hey "));
        assert_eq!(match_prefix("ping", &candidates, false), None);
    }

    #[test]
    fn prefix_is_stripped_from_the_first_token() {
        let bang = MatchedPrefix { len: 1, mention: false };
        assert_eq!(split_command("!ping a b", bang), Some(("ping".to_string(), strings(&["a", "b"]))));
        assert_eq!(split_command("! ping", bang), None);
        assert_eq!(split_command("!", bang), None);

        let multi = MatchedPrefix { len: "hey ".len(), mention: false };
        assert_eq!(split_command("hey ping", multi), None);

        let mention = MatchedPrefix { len: "<@5>".len(), mention: true };
        assert_eq!(split_command("<@5> ping x", mention), Some(("ping".to_string(), strings(&["x"]))));
        assert_eq!(split_command("<@5>ping", mention), Some(("ping".to_string(), Vec::new())));
        assert_eq!(split_command("<@5>", mention), None);
    }

    #[test]
    fn mention_prefix_accepts_both_forms() {
        assert_eq!(mention_prefix("<@5> ping", 5).as_deref(), Some("<@5>"));
        assert_eq!(mention_prefix("<@!5> ping", 5).as_deref(), Some("<@!5>"));
        assert_eq!(mention_prefix("<@6> ping", 5), None);
    }
}
