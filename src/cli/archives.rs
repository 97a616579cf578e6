//! The `archives` command.

use console::style;

use wasteback::Config;

/// Print every supported archive.
pub fn cmd_archives(config: &Config) -> anyhow::Result<()> {
    let registry = config.registry()?;
    let default = config.settings().default_archive;

    println!("\n{}", style("Supported archives").bold());
    println!("{}", "-".repeat(60));
    println!("{:<8} Name", "ID");
    println!("{}", "-".repeat(60));

    for (id, name) in registry.list() {
        let marker = if id == default { " (default)" } else { "" };
        println!("{:<8} {}{}", id, name, style(marker).dim());
    }

    Ok(())
}
