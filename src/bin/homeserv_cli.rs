//!
//! homeserv CLI
//! ------------
//! Small command-line shell over the client library. The session and cart are kept in a
//! JSON file between invocations, so `login` followed by `cart-add` and `book` behaves
//! like one browser session.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};

use homeserv::booking::{BookingDetails, ServiceAddress};
use homeserv::config::ClientConfig;
use homeserv::identity::{LoginRequest, SignupRequest};
use homeserv::models::ServiceOffering;
use homeserv::AppContext;

const DEFAULT_SESSION_FILE: &str = "homeserv_session.json";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--session-file <path>] <command> [args...]\n\nCommands:\n  login <email> <password>\n  signup <email> <password> [first_name] [last_name]\n  logout\n  whoami\n  refresh\n  navigate <path>\n  services\n  cart\n  cart-add <service_id>\n  cart-remove <service_id>\n  cart-hours <service_id> <hours>\n  book <name> <phone> <locality> <city> <state> <pincode> <YYYY-MM-DD> <HH:MM>\n  bookings\n\nEnvironment:\n  HOMESERV_API_URL, HOMESERV_TIMEOUT_SECS, HOMESERV_OTP_COOLDOWN_SECS, HOMESERV_SESSION_FILE\n  RUST_LOG (default: info)"
    );
}

fn arg<'a>(rest: &'a [String], idx: usize, name: &str) -> Result<&'a str> {
    rest.get(idx).map(String::as_str).ok_or_else(|| anyhow!("missing argument <{}>", name))
}

fn parse_id(s: &str) -> Result<i64> {
    s.parse::<i64>().with_context(|| format!("invalid service id '{}'", s))
}

fn print_redirects(ctx: &AppContext) {
    for loc in ctx.navigator.take() {
        println!("redirected to {}", loc);
    }
}

async fn fetch_services(ctx: &AppContext) -> Result<Vec<ServiceOffering>> {
    ctx.admin.fetch_services().await.context("failed to load services")
}

async fn run(ctx: &AppContext, command: &str, rest: &[String]) -> Result<()> {
    match command {
        "login" => {
            let req = LoginRequest { email: arg(rest, 0, "email")?.to_string(), password: arg(rest, 1, "password")?.to_string() };
            let user = ctx.auth.login(&req).await.context("login failed")?;
            println!("logged in as {} ({})", user.email.as_deref().unwrap_or("-"), user.role);
            let landed = ctx.router.navigate("/").await?;
            println!("landing: {}", landed);
        }
        "signup" => {
            let req = SignupRequest {
                email: arg(rest, 0, "email")?.to_string(),
                password: arg(rest, 1, "password")?.to_string(),
                first_name: rest.get(2).cloned(),
                last_name: rest.get(3).cloned(),
                phone_number: None,
            };
            let user = ctx.auth.signup(&req).await.context("signup failed")?;
            println!("registered {} ({})", user.email.as_deref().unwrap_or("-"), user.role);
        }
        "logout" => {
            ctx.auth.logout();
            println!("logged out");
        }
        "whoami" => match ctx.session.current_user() {
            Some(u) => println!(
                "{} <{}> role={} verified={}",
                u.name.as_deref().unwrap_or("-"),
                u.email.as_deref().unwrap_or("-"),
                u.role,
                u.is_email_verified
            ),
            None => println!("not logged in"),
        },
        "refresh" => {
            ctx.auth.refresh_access_token().await.context("token refresh failed")?;
            println!("access token refreshed");
        }
        "navigate" => {
            let landed = ctx.router.navigate(arg(rest, 0, "path")?).await?;
            println!("{}", landed);
        }
        "services" => {
            for s in fetch_services(ctx).await? {
                println!("{:>4}  {:<30} {:>10.2}", s.id, s.name, s.base_price);
            }
        }
        "cart" => {
            for item in ctx.cart.items() {
                println!("{:>4}  {:<30} {:>10.2} x {}", item.service_id, item.name, item.unit_price, item.hours.unwrap_or(item.quantity as f64));
            }
            println!("total: {:.2}", ctx.cart.total_price());
        }
        "cart-add" => {
            let id = parse_id(arg(rest, 0, "service_id")?)?;
            let services = fetch_services(ctx).await?;
            let service = services.iter().find(|s| s.id == id).ok_or_else(|| anyhow!("no service with id {}", id))?;
            ctx.cart.add_item(service);
            println!("added {} ({} in cart)", service.name, ctx.cart.item_count());
        }
        "cart-remove" => {
            ctx.cart.remove_item(parse_id(arg(rest, 0, "service_id")?)?);
            println!("{} in cart", ctx.cart.item_count());
        }
        "cart-hours" => {
            let id = parse_id(arg(rest, 0, "service_id")?)?;
            let hours: f64 = arg(rest, 1, "hours")?.parse().context("invalid hours")?;
            ctx.cart.update_hours(id, hours)?;
            println!("total: {:.2}", ctx.cart.total_price());
        }
        "book" => {
            let details = BookingDetails {
                name: arg(rest, 0, "name")?.to_string(),
                phone_number: arg(rest, 1, "phone")?.to_string(),
                address: ServiceAddress {
                    locality: arg(rest, 2, "locality")?.to_string(),
                    city: arg(rest, 3, "city")?.to_string(),
                    state: arg(rest, 4, "state")?.to_string(),
                    pincode: arg(rest, 5, "pincode")?.to_string(),
                },
                service_date: NaiveDate::parse_from_str(arg(rest, 6, "date")?, "%Y-%m-%d").context("invalid date")?,
                service_time: NaiveTime::parse_from_str(arg(rest, 7, "time")?, "%H:%M").context("invalid time")?,
            };
            let ids = ctx.bookings.create_booking(&details).await.context("booking failed")?;
            println!("created bookings {:?}", ids);
        }
        "bookings" => {
            for b in ctx.customer.fetch_bookings().await.context("failed to load bookings")? {
                let name = b.service.as_ref().map(|s| s.name.as_str()).unwrap_or("-");
                println!("{:>4}  {:<30} {}", b.id, name, b.status.as_str());
            }
        }
        other => bail!("unknown command '{}'", other),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    let mut config = ClientConfig::from_env();
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                if i + 1 >= args.len() { eprintln!("--api requires a URL"); print_usage(&program); std::process::exit(2); }
                config.base_url = args[i + 1].clone();
                i += 2; continue;
            }
            "--session-file" => {
                if i + 1 >= args.len() { eprintln!("--session-file requires a path"); print_usage(&program); std::process::exit(2); }
                config.session_file = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            _ => { positional.push(args[i].clone()); i += 1; }
        }
    }
    if config.session_file.is_none() {
        config.session_file = Some(PathBuf::from(DEFAULT_SESSION_FILE));
    }
    let Some((command, rest)) = positional.split_first() else {
        print_usage(&program);
        std::process::exit(2);
    };

    let ctx = AppContext::from_config(config).context("failed to initialise client")?;
    // A persisted session only becomes live once the guard validates it on the first navigation.
    if ctx.session.has_pending() && command != "logout" {
        ctx.router.navigate("/").await?;
    }
    let result = run(&ctx, command, rest).await;
    print_redirects(&ctx);
    result
}
