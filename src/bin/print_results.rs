use std::path::PathBuf;
use tasksend::results;

fn main() -> anyhow::Result<()> {
    let path: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "results.bin".to_string())
        .into();

    let results = results::load(&path)?;
    for result in &results {
        println!("{}", result);
    }

    if !results.is_empty() {
        let mean_latency =
            results.iter().map(|r| r.latency_ms).sum::<f64>() / results.len() as f64;
        println!("\n=== {} results ===", results.len());
        println!("Mean latency: {:.1} msec", mean_latency);
    }
    Ok(())
}
