use std::{env, sync::Arc, time::Duration};

use amethyst::bot::{
    commands::utility::utility_category,
    platforms::discord::discord::{DiscordHandler, SerenityClient},
    scheduler::tasks::Task,
    state::def::{AmethystBot, BotConfig, BotError, BotResult},
};
use serenity::{all::GatewayIntents, http::Http, Client};
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[tokio::main]
async fn main() -> BotResult<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("AMETHYST_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    dotenvy::dotenv().ok();
    let config = match env::var("AMETHYST_CONFIG") {
        Ok(path) => BotConfig::from_file(path)?,
        Err(_) => BotConfig::from_env()?,
    };
    let token = env::var("DISCORD_TOKEN").map_err(|_| BotError::Config("DISCORD_TOKEN is not set".into()))?;

    let http = Arc::new(Http::new(&token));
    let me = http.get_current_user().await?;
    info!("Logged in as {} ({})", me.name, me.id);

    let bot = AmethystBot::builder(Arc::new(SerenityClient::new(http)))
        .id(me.id.get())
        .config(config)
        .category(utility_category())
        .build()?;

    bot.create_task(Task::new("collector-report", Duration::from_secs(300), |bot| {
        Box::pin(async move {
            info!(
                "Pending collectors: {} message, {} component, {} reaction",
                bot.message_collectors.len(),
                bot.component_collectors.len(),
                bot.reaction_collectors.len()
            );
            Ok(())
        })
    }));

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&token, intents).event_handler(DiscordHandler::new(bot.clone())).await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await?;
    bot.shutdown();
    Ok(())
}
