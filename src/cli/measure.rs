//! The `measure` command.

use console::style;

use wasteback::{
    CompositionReport, Config, EmissionsModel, MeasureOptions, MeasureRequest, PerByteModel,
    Wasteback,
};

use super::helpers::{format_bytes, share, spinner, RULE};

pub struct MeasureArgs {
    pub url: String,
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub archive: Option<String>,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub resources: bool,
    pub scan_scripts: bool,
    pub concurrency: Option<usize>,
    pub json: bool,
}

/// Measure a page and print the report.
pub async fn cmd_measure(config: &Config, args: MeasureArgs) -> anyhow::Result<()> {
    let wasteback = Wasteback::from_config(config)?;

    let request = MeasureRequest {
        url: args.url,
        year: args.year,
        month: args.month,
        day: args.day,
        archive: args.archive,
    };
    // Only the requested year is searched unless a range is given.
    let options = MeasureOptions {
        include_resources: args.resources,
        start_year: Some(args.from_year.unwrap_or(args.year)),
        end_year: Some(args.to_year.unwrap_or(args.year)),
        scan_scripts: args.scan_scripts,
        concurrency: args.concurrency,
    };

    let pb = (!args.json).then(|| {
        spinner(format!(
            "Measuring {} as archived around {}-{:02}-{:02}...",
            request.url,
            request.year,
            request.month.unwrap_or(1),
            request.day.unwrap_or(1)
        ))
    });
    let result = wasteback.measure(&request, &options).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let report = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &PerByteModel::default());
    }

    Ok(())
}

fn print_report(report: &CompositionReport, model: &dyn EmissionsModel) {
    let total = report.sizes.total();

    println!(
        "{} Found a memento! Datetime = {}",
        style("✓").green(),
        report.memento
    );

    println!("\n{}\n", RULE);
    println!("{}\n", style("MEMENTO INFO").bold());
    println!("  Memento URL:    {}", report.memento_url);
    println!("  Web Archive:    {}", report.archive);
    println!("  Organisation:   {}", report.archive_org);
    println!("  Website:        {}", report.archive_url);

    println!("\n{}\n", RULE);
    println!("{}\n", style("PAGE SIZE").bold());
    println!("  Data:           {}", format_bytes(total.bytes));
    println!(
        "  Emissions:      {:.3} g CO₂e",
        model.grams_for_bytes(total.bytes)
    );
    println!("  Completeness:   {}", report.completeness);
    if report.malformed_references > 0 {
        println!(
            "  {} {} malformed reference(s) skipped",
            style("!").yellow(),
            report.malformed_references
        );
    }

    println!("\n{}\n", RULE);
    println!("{}", style("PAGE COMPOSITION").bold());
    for (category, entry) in report.sizes.non_empty().filter(|(_, e)| e.bytes > 0) {
        println!("\n  {}", style(category.as_str().to_uppercase()).cyan());
        println!("      Count:      {}", entry.count);
        println!(
            "      Data:       {} bytes ({})",
            entry.bytes,
            share(entry.bytes, total.bytes)
        );
        println!(
            "      Emissions:  {:.3} g CO₂e",
            model.grams_for_bytes(entry.bytes)
        );
    }

    if let Some(ref resources) = report.resources {
        println!("\n{}\n", RULE);
        println!("{}\n", style("RESOURCES").bold());
        for r in resources {
            let marker = if r.fetch_succeeded {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!(
                "  {} {:<10} {:>12}  {}",
                marker,
                r.category,
                format_bytes(r.size),
                r.url
            );
        }
    }

    println!("\n{}\n", RULE);
}
