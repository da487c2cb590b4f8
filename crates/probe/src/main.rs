//! `tradewire-probe` -- end-to-end diagnostic for the Tradewire SDK.
//!
//! Logs in, pulls the profile and a market snapshot, connects the
//! realtime client, and logs every event until Ctrl-C. Useful for
//! checking a deployment (and the SDK) from the command line.
//!
//! # Environment variables
//!
//! | Variable                  | Required | Default                        | Description                |
//! |---------------------------|----------|--------------------------------|----------------------------|
//! | `TRADEWIRE_API_URL`       | no       | `http://localhost:3000/api/v1` | REST base URL              |
//! | `TRADEWIRE_REALTIME_URL`  | no       | `ws://localhost:3001`          | Realtime WebSocket URL     |
//! | `TRADEWIRE_USERNAME`      | yes      | --                             | Account to log in with     |
//! | `TRADEWIRE_PASSWORD`      | yes      | --                             | Password for the account   |

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradewire_api::session::MemorySessionStore;
use tradewire_api::{ApiClient, ApiConfig};
use tradewire_realtime::{EventKind, RealtimeClient, RealtimeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradewire_probe=info,tradewire_api=info,tradewire_realtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let username =
        std::env::var("TRADEWIRE_USERNAME").context("TRADEWIRE_USERNAME must be set")?;
    let password =
        std::env::var("TRADEWIRE_PASSWORD").context("TRADEWIRE_PASSWORD must be set")?;
    let realtime_url =
        std::env::var("TRADEWIRE_REALTIME_URL").unwrap_or_else(|_| "ws://localhost:3001".into());

    // The probe is throwaway; no point persisting its session to disk.
    let api = ApiClient::new(ApiConfig::from_env(), Box::new(MemorySessionStore::new()));

    let user = api
        .login(&username, &password)
        .await
        .context("login failed")?;
    tracing::info!(user_id = %user.id, username = %user.username, "Authenticated");

    let profile = api.profile().await.context("profile fetch failed")?;
    tracing::info!(balance = ?profile.balance, "Profile loaded");

    let quotes = api
        .market_overview()
        .await
        .context("market overview failed")?;
    tracing::info!(symbols = quotes.len(), "Market snapshot loaded");
    for quote in quotes.iter().take(5) {
        tracing::info!(
            symbol = %quote.symbol,
            price = quote.price,
            change_percent = quote.change_percent,
            "Quote",
        );
    }

    let transactions = api.transactions().await.context("transactions failed")?;
    tracing::info!(count = transactions.len(), "Transaction history loaded");

    let realtime = RealtimeClient::new(RealtimeConfig::default());
    for kind in EventKind::ALL {
        realtime.subscribe(kind, |event| {
            tracing::info!(?event, "Realtime event");
        });
    }

    let token = api
        .session()
        .access_token()
        .context("no access token after login")?;
    realtime
        .connect(&token, &realtime_url)
        .await
        .context("realtime connect failed")?;
    tracing::info!(url = %realtime_url, "Realtime connected, watching events (Ctrl-C to exit)");

    tokio::signal::ctrl_c().await.ok();

    realtime.disconnect();
    api.logout().await.ok();
    tracing::info!("Probe finished");
    Ok(())
}
