pub mod bot;

pub use bot::{
    chat_event::chat_event::{Author, BotMessage, ComponentInteraction, InteractionCommand, Invocation, Reaction, Snowflake},
    collectors::collectors::{CollectorError, CollectorOptions},
    commands::{commands::{Command, CommandContext}, Category},
    handler::handler::{handle_component, handle_interaction, handle_message, handle_reaction, BotClient},
    state::def::{AmethystBot, AmethystError, BotConfig, BotError, BotResult, CooldownSpec},
};
