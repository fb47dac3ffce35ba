use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use clap::Parser;
use movie_catalog::auth::InMemoryAuth;
use movie_catalog::cmds::{run, App};
use movie_catalog::image_host::NoImageHost;
use movie_catalog::{in_memory, mongo};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

async fn async_main(app: App) -> ::anyhow::Result<()> {
    let App {
        mongodb_uri,
        database,
        user,
        cmd,
    } = app;

    let auth = Arc::new(match user {
        Some(u) => InMemoryAuth::signed_in(u),
        None => InMemoryAuth::new(),
    });
    let images = Arc::new(NoImageHost);

    let services = match mongodb_uri {
        Some(uri) => mongo(uri, database, auth, images).await?,
        None => {
            tracing::warn!("no mongodb uri given, using an empty in-memory store");
            in_memory(auth, images).1
        },
    };

    let out = run(cmd, &services).await?;
    println!("{}", ::serde_json::to_string_pretty(&out)?);

    Ok(())
}

fn main() {
    let app = App::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(::std::io::stderr))
        .init();

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name_fn(|| {
            let num = NUM.fetch_add(1, Ordering::SeqCst);
            format!("movie_catalog-worker-{}", num)
        })
        .build()
    {
        Ok(r) => r,
        Err(e) => return eprintln!("{}", e),
    };

    if let Err(e) = rt.block_on(async_main(app)) {
        eprintln!("error: {:#}", e);
        ::std::process::exit(1);
    }
}

static NUM: AtomicU32 = AtomicU32::new(0);
