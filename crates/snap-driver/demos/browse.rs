//! Fetch a page and print what a script-free client sees
//!
//! Usage: `cargo run --example browse -- <url> [link text to follow]`

use snap_driver::{By, Driver};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "about:blank".to_string());
    let follow = args.next();

    let driver = Driver::new()?;
    driver.get(&url)?;

    if let Some(text) = follow {
        tracing::info!("Following link {:?}", text);
        driver.find_element(&By::partial_link_text(text))?.click()?;
    }

    println!("URL:   {}", driver.current_url());
    println!("Title: {}", driver.title());

    let links = driver.find_elements(&By::tag_name("a"))?;
    println!("\n{} links:", links.len());
    for link in &links {
        let href = link.attribute("href")?.unwrap_or_default();
        println!("  {:<40} {}", link.text()?, href);
    }

    let forms = driver.find_elements(&By::tag_name("form"))?;
    println!("\n{} forms:", forms.len());
    for form in &forms {
        let action = form.attribute("action")?.unwrap_or_default();
        let method = form.attribute("method")?.unwrap_or_else(|| "get".into());
        let fields = form.find_elements(&By::css("input, select, textarea"))?;
        println!("  {} {} ({} fields)", method.to_uppercase(), action, fields.len());
    }

    let cookies = driver.manage().cookies();
    if !cookies.is_empty() {
        println!("\nCookies:");
        for cookie in cookies {
            println!("  {}={} ({}{})", cookie.name, cookie.value, cookie.domain, cookie.path);
        }
    }

    Ok(())
}
