//! Demo family seed script
//!
//! Creates a demo account, a family and one child, then fills the last
//! `--days` days (UTC) with generated feedings, naps and diaper changes so the
//! stats and chart endpoints have something to show.
//!
//! Usage:
//!   DATABASE_URL=... ./seed-demo --email demo@babylog.app --days 7
//!
//! Environment variables:
//!   DATABASE_URL  : PostgreSQL connection string (required)
//!   DEMO_PASSWORD : Password for the demo account (default: Demo2024!)
//!   BCRYPT_COST   : Password hashing cost, as for the API (default: 10)

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::Parser;
use rand::Rng;
use std::env;

use babylog_api::{
    config, db,
    models::{
        child::CreateChildRequest, feeding::FeedingRequest, sleep::SleepRequest,
        user::RegisterRequest, waste::WasteRequest,
    },
    services::{
        auth::{AuthService, TokenSettings},
        children::ChildService,
        family::FamilyService,
        records::RecordService,
    },
    store::{PgStore, UserStore},
};

#[derive(Parser)]
#[command(name = "seed-demo", about = "Seed a demo family with a week of records")]
struct Args {
    /// Email of the demo account
    #[arg(long, default_value = "demo@babylog.app")]
    email: String,

    /// Number of days of history to generate, ending today
    #[arg(long, default_value_t = 7)]
    days: i64,

    /// Name of the demo child
    #[arg(long, default_value = "Juniper")]
    child: String,
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let demo_password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "Demo2024!".to_string());

    println!("=== Seed Demo Family ===");

    let pool = db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    db::run_migrations(&pool).await.context("Failed to run migrations")?;
    let store = PgStore::new(pool);

    if store.find_user_by_email(&args.email).await?.is_some() {
        anyhow::bail!("{} already exists; pick another --email", args.email);
    }

    // 1. Account, family, child
    let settings = TokenSettings {
        jwt_secret: String::new(),
        ttl_seconds: 0,
        bcrypt_cost: config::bcrypt_cost()?,
    };
    let auth = AuthService::register(
        &store,
        &settings,
        &RegisterRequest {
            email: args.email.clone(),
            password: demo_password,
            name: "Demo Parent".into(),
        },
    )
    .await
    .context("Failed to create demo user")?;
    let user = store.get_user(auth.user.id).await?;

    let family = FamilyService::create(&store, &user, "Demo Family")
        .await
        .context("Failed to create family")?;
    let child = ChildService::create(
        &store,
        family.id,
        &CreateChildRequest {
            name: args.child.clone(),
            birth_date: Some(Utc::now().date_naive() - Duration::days(120)),
        },
    )
    .await
    .context("Failed to create child")?;
    println!("  Family {} / child {}", family.id, child.id);

    // 2. Records, one UTC day at a time
    let mut rng = rand::thread_rng();
    let now = Utc::now();
    let today = now.date_naive();
    let (mut feedings, mut sleeps, mut wastes) = (0, 0, 0);

    for offset in (0..args.days).rev() {
        let start = day_start(today - Duration::days(offset));

        // a feeding roughly every three hours
        let mut t = start + Duration::minutes(rng.gen_range(0..60));
        while t < start + Duration::days(1) && t < now {
            let breast = rng.gen_bool(0.4);
            let req = FeedingRequest {
                kind: if breast { "breast" } else { "bottle" }.into(),
                amount: if breast {
                    rng.gen_range(8.0..20.0_f64).round()
                } else {
                    rng.gen_range(3.0..7.0_f64).round()
                },
                side: breast.then(|| if rng.gen_bool(0.5) { "left" } else { "right" }.to_string()),
                recorded_at: Some(t),
            };
            RecordService::save_feeding(&store, &child, user.id, None, &req).await?;
            feedings += 1;
            t += Duration::minutes(rng.gen_range(150..210));
        }

        // two daytime naps and a night sleep
        for (hour, length) in [(9, 90), (14, 75), (20, 540)] {
            let started_at = start + Duration::hours(hour) + Duration::minutes(rng.gen_range(0..30));
            let ended_at = started_at + Duration::minutes(length + rng.gen_range(-20..20));
            if ended_at >= now {
                continue;
            }
            let req = SleepRequest {
                started_at,
                ended_at: Some(ended_at),
            };
            RecordService::save_sleep(&store, &child, user.id, None, &req).await?;
            sleeps += 1;
        }

        for _ in 0..rng.gen_range(5..9) {
            let recorded_at = start + Duration::minutes(rng.gen_range(0..24 * 60));
            if recorded_at >= now {
                continue;
            }
            let req = WasteRequest {
                kind: rng.gen_range(1..=3),
                notes: String::new(),
                recorded_at: Some(recorded_at),
            };
            RecordService::save_waste(&store, &child, user.id, None, &req).await?;
            wastes += 1;
        }
    }

    println!("  {feedings} feedings, {sleeps} sleeps, {wastes} wastes");
    println!("=== Done: log in as {} ===", args.email);
    Ok(())
}
