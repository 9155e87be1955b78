use anyhow::{bail, Context, Result};
use feed_session::{
    Category, Config, FeedSession, FeedSource, LoadingState, SessionOptions, TracingNotifier,
    Viewer,
};
use remote_store::RestStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.app.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.app.json_logs {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config);

    let category = match std::env::var("FEED_CATEGORY") {
        Ok(raw) if !raw.trim().is_empty() => raw
            .parse::<Category>()
            .context("Invalid FEED_CATEGORY")?,
        _ => Category::All,
    };
    let source = match std::env::var("FEED_SOURCE") {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.parse::<FeedSource>().context("Invalid FEED_SOURCE")?
        }
        _ => FeedSource::Recent,
    };
    let query = std::env::var("FEED_QUERY").ok();

    info!(
        env = %config.app.env,
        store = %config.store.url,
        %category,
        ?source,
        query = query.as_deref().unwrap_or(""),
        "Starting feed session"
    );

    let store = RestStore::new(config.rest_store_config())
        .context("Failed to create remote store client")?;
    let viewer = Viewer::from_user_id(config.store.user_id.clone());

    let session = FeedSession::new(
        Arc::new(store),
        viewer,
        Arc::new(TracingNotifier),
        SessionOptions {
            source,
            ..config.session_options()
        },
    );

    let state = session.load(category, query.as_deref()).await;
    session.close();

    match state.loading_state {
        LoadingState::Loaded => {
            info!(items = state.items.len(), "feed loaded");
            for (position, item) in state.items.iter().enumerate() {
                info!(
                    position,
                    id = %item.id,
                    title = %item.title,
                    creator = %item.creator,
                    category = %item.category,
                    likes = item.counters.like_count,
                    views = item.counters.view_count,
                    liked = state.is_liked(&item.id),
                    "feed item"
                );
            }
            Ok(())
        }
        LoadingState::Failed => bail!(
            "Feed load failed: {}",
            state.error_message.unwrap_or_default()
        ),
        other => bail!("Feed load did not complete: {:?}", other),
    }
}
