use bkfile::container::{Container, ContainerOptions};
use bkfile::convert::{self, default_merge_output, default_output};
use bkfile::stock::StockReport;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "bk", about = "Read, extend and merge BK point-of-sale backup files")]
struct Cli {
    /// Verbose diagnostics (per-record drops, pipeline stages)
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a parsed invoice (JSON) to a BK file
    Convert {
        /// Parsed invoice JSON produced by the extractor
        #[arg(long)]
        nf: PathBuf,
        /// Existing BK file to extend; a new one is created when absent
        #[arg(long)]
        bk: Option<PathBuf>,
        /// Output BK file (default: <nf stem>_converted.bk)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Second BK file to merge the result with
        #[arg(long)]
        merge: Option<PathBuf>,
    },
    /// Merge the invoices of OTHER into BASE
    Merge {
        base:  PathBuf,
        other: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show header, separators, blocks and decoded invoices
    Inspect {
        input: PathBuf,
        /// Dump the record layout and decoded tables as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let options = ContainerOptions::default();

    match cli.command {

        // ── Convert ──────────────────────────────────────────────────────────
        Commands::Convert { nf, bk, output, merge } => {
            let invoice = convert::read_invoice(&nf)?;
            let output  = output.unwrap_or_else(|| default_output(&nf));
            let result  = convert::convert_invoice(&invoice, bk.as_deref(), &output, options.clone())?;
            println!("Saved {} invoice(s) to {}", result.invoices, result.output.display());

            if let Some(other) = merge {
                let merged  = default_merge_output(&other);
                let summary = convert::merge_files(&output, &other, &merged, options)?;
                println!("Merged {} invoice(s) ({} already present) into {}",
                         summary.copied, summary.skipped, merged.display());
            }
            print_stock(&result.stock);
        }

        // ── Merge ────────────────────────────────────────────────────────────
        Commands::Merge { base, other, output } => {
            let summary = convert::merge_files(&base, &other, &output, options)?;
            println!("Merged {} invoice(s) ({} already present) into {}",
                     summary.copied, summary.skipped, output.display());
        }

        // ── Inspect ──────────────────────────────────────────────────────────
        Commands::Inspect { input, json } => {
            let bk = Container::open(&input, options)?;
            if json {
                let dump = serde_json::json!({
                    "fields":     bk.schema().fields(),
                    "repository": bk.repository(),
                });
                println!("{}", serde_json::to_string_pretty(&dump)?);
                return Ok(());
            }
            println!("── BK container ─────────────────────────────────────────");
            println!("  Path           {}", input.display());
            if let Some(h) = bk.header() {
                println!("  Version        {}", h.version);
                println!("  Size           {} B", h.size);
            }
            println!("  Null regions   {}", bk.null_regions().len());
            for r in bk.null_regions() {
                println!("    #{:<3} {:>8}..={:<8} {:>6} B", r.id, r.start, r.end, r.size);
            }
            println!("  Blocks         {}", bk.blocks().len());
            for b in bk.blocks() {
                println!("    #{:<3} {:<10} {:>8}..={:<8} {:>6} B  text={} binary={}  {}",
                         b.id, b.kind, b.start, b.end, b.size, b.has_text, b.has_binary, b.signature_hex);
            }
            println!("  Decode         {}", bk.last_report().summary());
            for f in &bk.last_report().failures {
                println!("    @{:<8} block {}: {}", f.offset, f.block_id, f.reason);
            }
            println!("{:<8} {:<5} {:<12} {:>12} {:>12}  {:<10} Cliente",
                     "Numero", "Serie", "Emissao", "Total", "Final", "Status");
            for inv in bk.repository().invoices() {
                println!("{:<8} {:<5} {:<12} {:>12} {:>12}  {:<10} {}",
                         inv.numero, inv.serie, inv.data_emissao.as_deref().unwrap_or("—"),
                         inv.valor_total, inv.valor_final, format!("{:?}", inv.status), inv.cliente);
            }
            println!("Total value: {}", bk.total_value());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn print_stock(stock: &StockReport) {
    if stock.is_empty() {
        return;
    }
    println!("\nStock updates:");
    println!("------------------------");
    for (codigo, delta) in stock {
        println!("Codigo:              {}", codigo);
        println!("Descricao:           {}", delta.descricao);
        println!("Quantidade anterior: {}", delta.quantidade_anterior);
        println!("Quantidade entrada:  {}", delta.quantidade_entrada);
        println!("Quantidade atual:    {}", delta.quantidade_atual);
        println!("------------------------");
    }
}
