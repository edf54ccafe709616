//! A single-classroom attendance server.
//!
//! Loads classes, users and tokens from a TOML fixture, optionally opens
//! an attendance session for a class, and serves WebSocket clients at
//! `ws://<bind>/ws?token=<token>`.

mod fixture;

use std::path::PathBuf;

use clap::Parser;
use rollcall::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::fixture::Fixture;

#[derive(Parser, Debug)]
#[command(name = "classroom")]
#[command(about = "Live attendance hub for one classroom")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080", env = "ROLLCALL_BIND")]
    bind: String,

    /// Classroom fixture (classes, users, tokens)
    #[arg(
        short,
        long,
        default_value = "demos/classroom/classroom.toml",
        env = "ROLLCALL_FIXTURE"
    )]
    fixture: PathBuf,

    /// Open an attendance session for this class on startup
    #[arg(short, long)]
    start: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classroom=info,rollcall=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let fixture = Fixture::load(&args.fixture)?;
    tracing::info!(
        fixture = %args.fixture.display(),
        classes = fixture.classes.len(),
        users = fixture.users.len(),
        "fixture loaded"
    );

    let server = RollcallServerBuilder::new()
        .bind(&args.bind)
        .hub_config(fixture.hub_config())
        .build(fixture.tokens(), fixture.store())
        .await?;

    if let Some(class) = args.start {
        let started = server.hub().start_attendance(ClassId::new(class)).await?;
        tracing::info!(
            class = %started.class_id,
            room = %started.room_id,
            "attendance session open"
        );
    }

    tracing::info!(addr = %server.local_addr()?, "listening");
    server.run().await?;
    Ok(())
}
