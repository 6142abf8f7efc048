//! Diagnostics commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, CollectResponse, HealthSnapshot};
use crate::output::{
    color_status, format_mb, format_percent, format_timestamp_ms, print_info, print_json,
    print_success, print_warning, tier_label, OutputFormat,
};

/// Row for the memory history table
#[derive(Tabled)]
struct MemoryRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Heap Used")]
    heap_used: String,
    #[tabled(rename = "Heap Total")]
    heap_total: String,
    #[tabled(rename = "RSS")]
    rss: String,
    #[tabled(rename = "External")]
    external: String,
    #[tabled(rename = "CPU")]
    cpu: String,
}

/// Show the sampler snapshot
pub async fn show_memory(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshot: HealthSnapshot = client.get("api/diagnostics/memory").await?;

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => print_snapshot(&snapshot),
    }

    Ok(())
}

/// Trigger corrective action on the server
pub async fn force_collect(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: CollectResponse = client.post("api/diagnostics/gc").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if result.collected {
                print_success("Memory was returned to the operating system");
            } else {
                print_info("Corrective action ran; nothing was reclaimed");
            }
            println!();
            print_snapshot(&result.snapshot);
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &HealthSnapshot) {
    let memory = snapshot.thresholds.memory;
    let cpu = snapshot.thresholds.cpu;

    println!("{}", "Process Health".bold());
    println!("{}", "=".repeat(60));

    match &snapshot.current {
        Some(current) => {
            let heap = current.reading.heap_used as f64;
            println!(
                "Heap Used:      {} ({})",
                format_mb(current.reading.heap_used).cyan(),
                color_status(tier_label(heap, memory.warning, memory.critical, memory.failure))
            );
            println!("Heap Total:     {}", format_mb(current.reading.heap_total));
            println!("RSS:            {}", format_mb(current.reading.rss));
            println!("External:       {}", format_mb(current.reading.external));
            println!(
                "CPU:            {} ({})",
                format_percent(current.cpu_usage).cyan(),
                color_status(tier_label(current.cpu_usage, cpu.warning, cpu.critical, cpu.failure))
            );
            println!(
                "Sampled At:     {}",
                format_timestamp_ms(current.reading.timestamp)
            );
        }
        None => print_warning("No sample has been taken yet"),
    }

    if snapshot.potential_leak {
        print_warning("Sustained heap growth: potential memory leak");
    }

    println!();
    println!("{}", "Thresholds".bold());
    println!("{}", "-".repeat(60));
    println!(
        "Memory:         {} / {} / {} MB",
        memory.warning, memory.critical, memory.failure
    );
    println!(
        "CPU:            {} / {} / {} %",
        cpu.warning, cpu.critical, cpu.failure
    );
    println!();

    if snapshot.history.memory.is_empty() {
        print_info("History is empty");
        return;
    }

    // Both histories are pushed together, so entries pair up by position
    let rows: Vec<MemoryRow> = snapshot
        .history
        .memory
        .iter()
        .enumerate()
        .map(|(i, reading)| MemoryRow {
            timestamp: format_timestamp_ms(reading.timestamp),
            heap_used: format_mb(reading.heap_used),
            heap_total: format_mb(reading.heap_total),
            rss: format_mb(reading.rss),
            external: format_mb(reading.external),
            cpu: snapshot
                .history
                .cpu
                .get(i)
                .map(|c| format_percent(c.usage))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!("\nTotal: {} samples", snapshot.history.memory.len());
}
