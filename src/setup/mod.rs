//! One-time interactive setup.
//!
//! Runs when the config file does not exist yet: collects the instance URL
//! and credentials (registering an OAuth app and logging in when the user
//! has none), the first feed, and the backlog/image preferences, then writes
//! the initial config. An unreachable instance here is fatal.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;

use crate::app::Result;
use crate::config::{Config, FeedConfig};
use crate::poster::MastodonPoster;

pub async fn run(client: &reqwest::Client, config_path: &Path) -> Result<Config> {
    println!("No config found at {}, let's set one up.", config_path.display());

    let url = prompt("What is your Mastodon instance URL? ")?;
    let (client_id, client_secret, access_token) =
        if yes_no("Do you have your app credentials already?")? {
            (
                prompt("What is your app's client id: ")?,
                prompt("What is your client secret: ")?,
                prompt("access_token: ")?,
            )
        } else {
            println!("Ok, I'll need a few things in order to get your access token");
            let name = prompt("app name (e.g. estuary): ")?;
            let (client_id, client_secret) =
                MastodonPoster::register_app(client, &url, &name).await?;
            let username = prompt("mastodon username (email): ")?;
            let password = prompt("mastodon password (not stored): ")?;
            let access_token = MastodonPoster::obtain_token(
                client,
                &url,
                &client_id,
                &client_secret,
                &username,
                &password,
            )
            .await?;
            (client_id, client_secret, access_token)
        };

    let feed_url = prompt("RSS/Atom feed URL to watch: ")?;
    let old_posts = yes_no("Shall already existing entries be posted, too?")?;
    let include_images = yes_no("Shall images be included in the post?")?;

    let config = Config {
        url,
        client_id,
        client_secret,
        access_token,
        include_images,
        // Without the backlog, start the watermark at "now" so only entries
        // published from here on get posted.
        updated: if old_posts { None } else { Some(Utc::now()) },
        feeds: vec![FeedConfig {
            url: feed_url,
            template: "{title} {url}".into(),
            generator: None,
        }],
    };
    config.validate()?;
    config.save(config_path)?;

    println!();
    println!(
        "Your estuary configuration has been saved to {}",
        config_path.display()
    );
    println!("Add a line like this to your crontab to check every 15 minutes:");
    println!("*/15 * * * * /usr/local/bin/estuary");
    println!();

    Ok(config)
}

fn prompt(question: &str) -> Result<String> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn yes_no(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [y/n] ", question))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes" | "1"))
}
