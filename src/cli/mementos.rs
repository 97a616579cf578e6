//! The `mementos` command.

use console::style;

use wasteback::pipeline::normalise_input_url;
use wasteback::{Config, Wasteback};

use super::helpers::spinner;

/// List the captures of a URL.
pub async fn cmd_mementos(
    config: &Config,
    url: &str,
    archive: Option<&str>,
    from_year: i32,
    to_year: Option<i32>,
    json: bool,
) -> anyhow::Result<()> {
    let wasteback = Wasteback::from_config(config)?;
    let profile = wasteback.archive(archive)?;
    let url = normalise_input_url(url)?;

    let pb = (!json).then(|| spinner(format!("Fetching available mementos from {}...", profile.name)));
    let result = wasteback
        .mementos(&url, archive, Some(from_year), to_year)
        .await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let mementos = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&mementos)?);
        return Ok(());
    }

    if mementos.is_empty() {
        println!("{} No mementos found.", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", listing_header(&url, mementos.len(), &profile.name));
    println!("{}", "-".repeat(40));
    for ts in &mementos {
        println!("  {}  {}", ts, style(ts.display_date()).dim());
    }

    Ok(())
}

fn listing_header(url: &str, count: usize, archive_name: &str) -> String {
    format!(
        "{} ({} memento(s) in {})",
        style(url).bold(),
        count,
        archive_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_shows_queried_url() {
        let url = normalise_input_url("example.com/about").unwrap();
        let header = console::strip_ansi_codes(&listing_header(&url, 2, "Wayback Machine")).to_string();
        assert_eq!(header, "https://example.com/about (2 memento(s) in Wayback Machine)");
    }
}
