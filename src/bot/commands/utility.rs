use crate::bot::commands::{
    args::{ArgKind, ArgSpec},
    commands::Command,
    Category,
};

/// `ping`, `echo` and `help`, registered by the binary.
pub fn utility_category() -> Category {
    Category::new("utility")
        .description("Built-in commands")
        .unique_commands(true)
        .command(ping_command())
        .command(echo_command())
        .command(help_command())
}

pub fn ping_command() -> Command {
    Command::new("ping", |bot, ctx| {
        Box::pin(async move {
            bot.client.send_message(ctx.channel_id(), "Pong!").await?;
            Ok(())
        })
    })
    .description("Checks that the bot is alive")
}

pub fn echo_command() -> Command {
    Command::new("echo", |bot, ctx| {
        Box::pin(async move {
            let text = ctx.args.rest("text").map(|words| words.join(" ")).unwrap_or_default();
            if text.is_empty() {
                bot.client.send_message(ctx.channel_id(), "Usage: echo <text>").await?;
                return Ok(());
            }
            bot.client.send_message(ctx.channel_id(), &text).await?;
            Ok(())
        })
    })
    .alias("say")
    .description("Repeats the given text")
    .usage("echo <text>")
    .arg(ArgSpec::new("text", ArgKind::Rest).description("Text to repeat"))
}

pub fn help_command() -> Command {
    Command::new("help", |bot, ctx| {
        Box::pin(async move {
            let listing = {
                let registry = bot.categories.read().await;
                registry
                    .categories()
                    .map(|category| {
                        let names: Vec<&str> = category.commands.iter().map(|c| c.name.as_str()).collect();
                        format!("{}: {}", category.name, names.join(", "))
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            bot.client.send_message(ctx.channel_id(), &listing).await?;
            Ok(())
        })
    })
    .alias("commands")
    .description("Lists every registered command")
}
